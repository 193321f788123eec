//! Wire messages
//!
//! Every frame is a JSON object with a `type` tag. Inbound frames decode into
//! [`ClientMessage`]; everything the server sends is a [`ServerMessage`].

use serde::{Deserialize, Serialize};

use crate::document::{DocumentView, LockStatus};
use crate::registry::ClientId;

/// Requests a client can send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the current document
    GetDocument,
    /// Try to take the editor lock
    RequestLock,
    /// Give the editor lock back
    ReleaseLock,
    /// Extend a held lease
    RenewLock,
    /// Replace the whole document
    Edit {
        /// New content; a missing field means an empty document
        #[serde(default)]
        content: String,
    },
}

impl ClientMessage {
    /// Every `type` tag this enum accepts
    pub const KINDS: [&'static str; 5] = [
        "get_document",
        "request_lock",
        "release_lock",
        "renew_lock",
        "edit",
    ];

    /// Tag name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::GetDocument => "get_document",
            ClientMessage::RequestLock => "request_lock",
            ClientMessage::ReleaseLock => "release_lock",
            ClientMessage::RenewLock => "renew_lock",
            ClientMessage::Edit { .. } => "edit",
        }
    }
}

/// Error codes carried in `error` replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame body was not a JSON object, or its fields were malformed
    InvalidJson,
    /// `type` missing or not recognised
    UnknownType,
    /// Edit refused because another client holds the lock
    EditLocked,
}

/// Messages the server sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection
    Init {
        client_id: ClientId,
        content: String,
        version: u64,
        clients: usize,
        lock_holder: Option<ClientId>,
        is_locked: bool,
    },
    /// Full document snapshot
    Document {
        content: String,
        version: u64,
        clients: usize,
        lock_holder: Option<ClientId>,
        is_locked: bool,
    },
    /// Edit accepted
    Ack { version: u64 },
    /// Answer to `request_lock`
    LockResponse {
        acquired: bool,
        lock_holder: Option<ClientId>,
    },
    /// Lock state change notification
    LockStatus {
        is_locked: bool,
        lock_holder: Option<ClientId>,
    },
    /// Answer to `release_lock`
    LockReleased,
    /// Answer to `renew_lock`
    LockRenewed { renewed: bool },
    /// Request failed
    Error {
        message: ErrorCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lock_holder: Option<ClientId>,
    },
}

impl ServerMessage {
    /// Build the `init` greeting
    pub fn init(client_id: ClientId, view: DocumentView, clients: usize) -> Self {
        ServerMessage::Init {
            client_id,
            content: view.document.content,
            version: view.document.version,
            clients,
            lock_holder: view.lock.holder,
            is_locked: view.lock.is_locked,
        }
    }

    /// Build a `document` snapshot
    pub fn document(view: DocumentView, clients: usize) -> Self {
        ServerMessage::Document {
            content: view.document.content,
            version: view.document.version,
            clients,
            lock_holder: view.lock.holder,
            is_locked: view.lock.is_locked,
        }
    }

    /// Build a `lock_status` notification
    pub fn lock_status(status: LockStatus) -> Self {
        ServerMessage::LockStatus {
            is_locked: status.is_locked,
            lock_holder: status.holder,
        }
    }

    /// Build an `error` reply without a holder
    pub fn error(code: ErrorCode) -> Self {
        ServerMessage::Error {
            message: code,
            lock_holder: None,
        }
    }

    /// Build the `edit_locked` rejection
    pub fn edit_locked(holder: ClientId) -> Self {
        ServerMessage::Error {
            message: ErrorCode::EditLocked,
            lock_holder: Some(holder),
        }
    }
}
