//! Error types for the LocalGuard voice node

use thiserror::Error;

/// Result type alias for voice node operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice node
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Local LLM request error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Context service error
    #[error("context error: {0}")]
    Context(String),

    /// Inference server supervision error
    #[error("supervisor error: {0}")]
    Supervisor(String),

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
