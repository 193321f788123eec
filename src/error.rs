//! Error types
//!
//! The document store itself is total and never fails; errors only arise at the
//! edges (socket I/O, encoding, configuration, delivery to a client's own handle).

use thiserror::Error;

use crate::registry::SendError;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for server and session operations
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or listener failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket read or write failure
    #[error("WebSocket error: {0}")]
    Transport(#[from] axum::Error),

    /// Outbound message could not be serialized
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// Delivery to the session's own connection failed
    #[error("failed to reach client: {0}")]
    Send(#[from] SendError),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Operation attempted on a session that is not active
    #[error("session is not active")]
    SessionClosed,
}
