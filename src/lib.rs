//! Pixel Core - German voice assistant daemon
//!
//! Continuous microphone listening gated behind a wake word, an ordered
//! intent cascade (timer, stopwatch, time, search, notification, weather,
//! camera, LLM fallback), serialized speech output, and a WebSocket server
//! that mirrors assistant status to remote display clients.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   Inputs                          │
//! │   Microphone capture  │  WebSocket clients       │
//! └───────────────┬──────────────────────────────────┘
//!                 │
//! ┌───────────────▼──────────────────────────────────┐
//! │              Assistant (wake gate)                │
//! │        IntentRouter → one handler per turn        │
//! └───────────────┬──────────────────────────────────┘
//!                 │
//! ┌───────────────▼──────────────────────────────────┐
//! │   Speaker (serialized TTS)  │  Registry broadcast │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod config;
pub mod daemon;
pub mod error;
pub mod router;
pub mod server;
pub mod services;
pub mod session;
pub mod skills;
pub mod voice;

pub use assistant::Assistant;
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use router::IntentRouter;
pub use session::SessionState;
