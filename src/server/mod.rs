//! HTTP/WebSocket server for remote display clients

mod registry;
mod ws;

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assistant::Assistant;
use crate::skills::CameraManager;

pub use registry::{ClientRegistry, DeviceClass, NotificationTarget};
pub use ws::{StatusState, WsIncoming, WsOutgoing};

/// Shared state for connection handlers
pub struct ServerState {
    /// Connected client registry
    pub registry: Arc<ClientRegistry>,
    /// The assistant that routes injected text
    pub assistant: Arc<Assistant>,
    /// Camera manager for the frame endpoint, when configured
    pub camera: Option<Arc<CameraManager>>,
}

/// The remote display server
pub struct ApiServer {
    port: u16,
    state: Arc<ServerState>,
}

impl ApiServer {
    /// Create a new server
    #[must_use]
    pub fn new(port: u16, state: Arc<ServerState>) -> Self {
        Self { port, state }
    }

    /// Build the router
    #[must_use]
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health))
            .route("/camera/frame", get(camera_frame))
            .with_state(self.state.clone())
            .merge(ws::router(self.state.clone()))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> crate::Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind server: {e}")))?;

        tracing::info!(port = self.port, "server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("server error: {e}")))?;

        Ok(())
    }

    /// Run the server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<crate::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// Liveness endpoint
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Latest camera frame as base64 JPEG
async fn camera_frame(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(camera) = &state.camera else {
        return Err(StatusCode::NOT_FOUND);
    };

    match camera.frame_base64().await {
        Some(frame) => Ok(Json(serde_json::json!({ "frame": frame }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
