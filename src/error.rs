//! Error types for emote

use thiserror::Error;

/// Result type alias for emote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating or playing speech
#[derive(Debug, Error)]
pub enum Error {
    /// Precondition failure (empty text, missing credential, unknown label).
    /// Never reaches the network
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Service responded but supplied no audio payload
    #[error("service returned no audio")]
    EmptyResponse,

    /// Network, auth or protocol failure from the speech service
    #[error("speech service error: {0}")]
    Service(String),

    /// A request is already in flight
    #[error("a speech request is already in progress")]
    Busy,

    /// Audio decoding or output error
    #[error("audio error: {0}")]
    Audio(String),

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
