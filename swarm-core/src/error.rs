//! Error types for the swarm client crates.
//!
//! All failure categories are unified into a single `SwarmError` enum with
//! conversions from the underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using SwarmError.
pub type SwarmResult<T> = Result<T, SwarmError>;

/// Unified error type for configuration, transport and reload failures.
#[derive(Error, Debug)]
pub enum SwarmError {
    // -- Configuration errors --
    /// Failed to load or parse configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- Socket errors --
    /// The WebSocket connection could not be opened or failed mid-stream.
    #[error("socket error: {0}")]
    Socket(String),

    /// The connection was closed by the peer.
    #[error("socket closed (code {code})")]
    SocketClosed {
        /// WebSocket close code.
        code: u16,
    },

    /// An inbound frame could not be decoded into a payload.
    #[error("invalid payload: {0}")]
    Payload(String),

    // -- Reload errors --
    /// Applying a reload to the document failed.
    #[error("document error: {0}")]
    Document(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SwarmError {
    fn from(e: serde_json::Error) -> Self {
        SwarmError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SwarmError {
    fn from(e: toml::de::Error) -> Self {
        SwarmError::Config(e.to_string())
    }
}
