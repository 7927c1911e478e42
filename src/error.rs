//! Error types for Pixel core

use thiserror::Error;

/// Result type alias for Pixel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Pixel core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad value)
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Weather service error
    #[error("weather error: {0}")]
    Weather(String),

    /// Web search error
    #[error("search error: {0}")]
    Search(String),

    /// Camera / object detection error
    #[error("camera error: {0}")]
    Camera(String),

    /// Invalid state for the requested operation
    #[error("invalid state: {0}")]
    State(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
