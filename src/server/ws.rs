//! WebSocket handler for remote display clients
//!
//! Clients receive status and notification events and may inject text to be
//! handled exactly like a spoken utterance.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::ServerState;
use crate::voice::Utterance;

/// Assistant status mirrored to remote displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    /// Woke up, waiting for a command
    Listening,
    /// Routing an utterance
    Processing,
    /// Speech output in progress
    Speaking,
    /// Nothing happening
    Idle,
}

/// Incoming WebSocket message from a client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsIncoming {
    /// Free text, treated exactly like a capture-loop utterance
    Text { text: String },
    /// Keepalive
    Ping,
}

/// Outgoing WebSocket message to a client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    /// Connection established
    Connected { message: String },
    /// Assistant status change
    Status { state: StatusState, text: String },
    /// Targeted notification
    Notification { message: String },
    /// Keepalive response
    Pong,
}

/// Build the WebSocket router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Handle the WebSocket upgrade request
async fn ws_upgrade(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let identity = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Handle one WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ServerState>, identity: String) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = Uuid::new_v4();

    // Channel for events destined for this client
    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(32);

    let device = state.registry.register(client_id, &identity, tx.clone()).await;

    let greeting = WsOutgoing::Connected {
        message: "Connected to Pixel Core".to_string(),
    };
    let _ = tx.send(greeting).await;

    tracing::info!(client = %client_id, device = %device, "WebSocket connected");

    // Pump registry events out to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&event) {
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle inbound messages
    let state_recv = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<WsIncoming>(&text) {
                    Ok(WsIncoming::Text { text }) => {
                        tracing::info!(client = %client_id, text = %text, "remote utterance");
                        state_recv
                            .assistant
                            .handle_utterance(Utterance::new(text))
                            .await;
                    }
                    Ok(WsIncoming::Ping) => {
                        let _ = tx.send(WsOutgoing::Pong).await;
                    }
                    Err(e) => {
                        tracing::debug!(client = %client_id, error = %e, "bad message");
                    }
                },
                Message::Close(_) => {
                    tracing::debug!(client = %client_id, "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry.unregister(client_id).await;
}
