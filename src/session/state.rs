//! Session state machine
//!
//! Tracks one connection from registration to teardown.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::ClientId;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Identifier assigned, not yet registered or greeted
    Connecting,
    /// Registered and processing requests
    Active,
    /// Torn down; terminal
    Closed,
}

/// Per-connection state
#[derive(Debug)]
pub struct SessionState {
    /// Identifier assigned at connect time
    pub client_id: ClientId,

    /// Remote peer address, when the transport knows it
    pub peer_addr: Option<SocketAddr>,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Frames received, valid or not
    pub messages_received: u64,

    /// Edits that replaced the document
    pub edits_applied: u64,

    /// Edits refused because someone else held the lock
    pub edits_rejected: u64,
}

impl SessionState {
    /// Create a new session state with a fresh identifier
    pub fn new() -> Self {
        Self::with_id(ClientId::generate())
    }

    /// Create a new session state with a given identifier
    pub fn with_id(client_id: ClientId) -> Self {
        Self {
            client_id,
            peer_addr: None,
            phase: SessionPhase::Connecting,
            connected_at: Instant::now(),
            messages_received: 0,
            edits_applied: 0,
            edits_rejected: 0,
        }
    }

    /// Move from connecting to active. Returns false from any other phase.
    pub fn activate(&mut self) -> bool {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Active;
            true
        } else {
            false
        }
    }

    /// Enter the terminal phase. Returns the phase the session was in.
    pub fn close(&mut self) -> SessionPhase {
        std::mem::replace(&mut self.phase, SessionPhase::Closed)
    }

    /// Check if the session is processing requests
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Check if the session has been torn down
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
