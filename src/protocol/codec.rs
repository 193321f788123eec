//! Frame encoding and decoding

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::message::{ClientMessage, ErrorCode, ServerMessage};

/// Encoded outbound text frame
///
/// Reference counted so one encoding can be queued to every peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Arc<str>);

impl Frame {
    /// Frame text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Frame {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for Frame {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Why an inbound frame was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not a JSON object, or a known type with malformed fields
    #[error("invalid JSON payload")]
    InvalidJson,
    /// `type` absent, not a string, or not a known request
    #[error("unknown message type: {0:?}")]
    UnknownType(Option<String>),
}

impl DecodeError {
    /// Error code to report back to the client
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::InvalidJson => ErrorCode::InvalidJson,
            DecodeError::UnknownType(_) => ErrorCode::UnknownType,
        }
    }
}

/// Decode one inbound text frame
pub fn decode(raw: &str) -> Result<ClientMessage, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| DecodeError::InvalidJson)?;
    let Some(object) = value.as_object() else {
        return Err(DecodeError::InvalidJson);
    };

    let kind = match object.get("type").and_then(Value::as_str) {
        Some(kind) => kind,
        None => return Err(DecodeError::UnknownType(None)),
    };
    if !ClientMessage::KINDS.contains(&kind) {
        return Err(DecodeError::UnknownType(Some(kind.to_owned())));
    }

    serde_json::from_value(value).map_err(|_| DecodeError::InvalidJson)
}

/// Encode one outbound message
pub fn encode(message: &ServerMessage) -> Result<Frame, serde_json::Error> {
    serde_json::to_string(message).map(Frame::from)
}
