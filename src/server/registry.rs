//! Connected remote display clients
//!
//! Tracks connections with their device class and fans out status and
//! notification events. All access goes through one lock; handles are never
//! given out.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use super::ws::{StatusState, WsOutgoing};

/// Coarse classification of a remote client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Desktop browser
    Pc,
    /// Phone or tablet
    Mobile,
}

impl DeviceClass {
    /// Infer the device class from a client-supplied identifying string
    ///
    /// Done once at connect time; the classification is immutable afterwards.
    #[must_use]
    pub fn infer(identity: &str) -> Self {
        let lower = identity.to_lowercase();
        if lower.contains("mobile") || lower.contains("android") || lower.contains("iphone") {
            Self::Mobile
        } else {
            Self::Pc
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pc => write!(f, "PC"),
            Self::Mobile => write!(f, "Mobile"),
        }
    }
}

/// Notification delivery target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTarget {
    /// Every connected client
    All,
    /// Clients of one device class
    Device(DeviceClass),
}

/// Per-connection record, owned exclusively by the registry
struct ClientHandle {
    device: DeviceClass,
    sender: mpsc::Sender<WsOutgoing>,
}

/// Registry of connected clients with event fan-out
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<Uuid, ClientHandle>>,
}

impl ClientRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected client, inferring its device class
    pub async fn register(
        &self,
        id: Uuid,
        identity: &str,
        sender: mpsc::Sender<WsOutgoing>,
    ) -> DeviceClass {
        let device = DeviceClass::infer(identity);
        self.clients
            .write()
            .await
            .insert(id, ClientHandle { device, sender });

        tracing::info!(client = %id, device = %device, "client connected");
        device
    }

    /// Remove a disconnected client
    pub async fn unregister(&self, id: Uuid) {
        if self.clients.write().await.remove(&id).is_some() {
            tracing::info!(client = %id, "client disconnected");
        }
    }

    /// Number of connected clients
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Broadcast a status event to every client (best-effort)
    pub async fn broadcast_status(&self, state: StatusState, text: &str) {
        let clients = self.clients.read().await;
        for (id, handle) in clients.iter() {
            let event = WsOutgoing::Status {
                state,
                text: text.to_string(),
            };
            if handle.sender.try_send(event).is_err() {
                tracing::debug!(client = %id, "status dropped, client slow or gone");
            }
        }
    }

    /// Send a notification to the targeted device class
    ///
    /// Returns how many clients the notification was delivered to; zero is a
    /// valid outcome meaning no such device is connected.
    pub async fn broadcast_notification(
        &self,
        target: NotificationTarget,
        message: &str,
    ) -> usize {
        let clients = self.clients.read().await;
        let mut delivered = 0;

        for handle in clients.values() {
            let matched = match target {
                NotificationTarget::All => true,
                NotificationTarget::Device(device) => handle.device == device,
            };
            if !matched {
                continue;
            }

            let event = WsOutgoing::Notification {
                message: message.to_string(),
            };
            if handle.sender.try_send(event).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(?target, delivered, "notification broadcast");
        delivered
    }
}
