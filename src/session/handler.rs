//! Per-connection request handling
//!
//! A [`SessionHandler`] owns one connection's view of the world. The transport
//! feeds it text frames; it answers the sender through the sender's own
//! handle and notifies peers through the hub's broadcaster.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::document::{AcquireOutcome, EditOutcome, LockStatus};
use crate::error::{Error, Result};
use crate::hub::CollabHub;
use crate::protocol::{self, ClientMessage, ErrorCode, ServerMessage};
use crate::registry::{ClientHandle, ClientId};

use super::state::{SessionPhase, SessionState};

/// Drives one connection through `connecting -> active -> closed`
pub struct SessionHandler {
    state: SessionState,
    hub: CollabHub,
    handle: Arc<dyn ClientHandle>,
}

impl SessionHandler {
    /// Create a session in the connecting phase with a fresh client id
    pub fn new(hub: CollabHub, handle: Arc<dyn ClientHandle>) -> Self {
        Self {
            state: SessionState::new(),
            hub,
            handle,
        }
    }

    /// Record the remote address for logging
    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.state.peer_addr = Some(peer_addr);
        self
    }

    /// This session's client id
    pub fn client_id(&self) -> &ClientId {
        &self.state.client_id
    }

    /// Session state and counters
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Register the connection and send the `init` greeting
    pub async fn start(&mut self) -> Result<()> {
        if !self.state.activate() {
            return Err(Error::SessionClosed);
        }

        let id = self.state.client_id.clone();
        let clients = self
            .hub
            .registry()
            .add(id.clone(), Arc::clone(&self.handle))
            .await;

        tracing::info!(
            client_id = %id,
            peer = ?self.state.peer_addr,
            clients = clients,
            "Client connected"
        );

        let view = self.hub.document().view().await;
        self.reply(&ServerMessage::init(id, view, clients))
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed or unknown requests get an error reply and leave the session
    /// open. An `Err` means the session can no longer reach its own client and
    /// must be closed.
    pub async fn handle_text(&mut self, raw: &str) -> Result<()> {
        if !self.state.is_active() {
            return Err(Error::SessionClosed);
        }
        self.state.messages_received += 1;

        match protocol::decode(raw) {
            Ok(message) => self.dispatch(message).await,
            Err(e) => {
                tracing::debug!(
                    client_id = %self.state.client_id,
                    error = %e,
                    "Rejected inbound frame"
                );
                self.reply(&ServerMessage::error(e.code()))
            }
        }
    }

    /// Handle one inbound binary frame. UTF-8 payloads are treated as text.
    pub async fn handle_binary(&mut self, data: &[u8]) -> Result<()> {
        match std::str::from_utf8(data) {
            Ok(text) => self.handle_text(text).await,
            Err(_) => {
                if !self.state.is_active() {
                    return Err(Error::SessionClosed);
                }
                self.state.messages_received += 1;
                self.reply(&ServerMessage::error(ErrorCode::InvalidJson))
            }
        }
    }

    /// Handle one decoded request
    pub async fn dispatch(&mut self, message: ClientMessage) -> Result<()> {
        tracing::trace!(
            client_id = %self.state.client_id,
            kind = message.kind(),
            "Handling request"
        );

        match message {
            ClientMessage::GetDocument => self.on_get_document().await,
            ClientMessage::RequestLock => self.on_request_lock().await,
            ClientMessage::ReleaseLock => self.on_release_lock().await,
            ClientMessage::RenewLock => self.on_renew_lock().await,
            ClientMessage::Edit { content } => self.on_edit(content).await,
        }
    }

    async fn on_get_document(&mut self) -> Result<()> {
        let view = self.hub.document().view().await;
        let clients = self.hub.registry().len().await;
        self.reply(&ServerMessage::document(view, clients))
    }

    async fn on_request_lock(&mut self) -> Result<()> {
        let id = &self.state.client_id;

        match self.hub.document().try_acquire_lock(id).await {
            AcquireOutcome::Acquired => {
                self.reply(&ServerMessage::LockResponse {
                    acquired: true,
                    lock_holder: Some(id.clone()),
                })?;
                self.hub
                    .broadcaster()
                    .broadcast(
                        &ServerMessage::lock_status(LockStatus::held_by(id.clone())),
                        Some(id),
                    )
                    .await;
                Ok(())
            }
            AcquireOutcome::Held { holder } => self.reply(&ServerMessage::LockResponse {
                acquired: false,
                lock_holder: Some(holder),
            }),
        }
    }

    async fn on_release_lock(&mut self) -> Result<()> {
        let id = &self.state.client_id;
        let released = self.hub.document().release_lock(id).await;
        self.reply(&ServerMessage::LockReleased)?;

        // Only announce a change that actually happened; a stray release must
        // not look like it cleared someone else's lock.
        if released {
            self.broadcast_unlocked().await;
        }
        Ok(())
    }

    async fn on_renew_lock(&mut self) -> Result<()> {
        let renewed = self
            .hub
            .document()
            .renew_lock(&self.state.client_id)
            .await;
        self.reply(&ServerMessage::LockRenewed { renewed })
    }

    async fn on_edit(&mut self, content: String) -> Result<()> {
        let id = self.state.client_id.clone();

        match self.hub.document().try_edit(&id, content).await {
            EditOutcome::Applied(view) => {
                self.state.edits_applied += 1;
                let version = view.document.version;
                self.reply(&ServerMessage::Ack { version })?;

                let clients = self.hub.registry().len().await;
                let peers = self
                    .hub
                    .broadcaster()
                    .broadcast(&ServerMessage::document(view, clients), Some(&id))
                    .await;

                tracing::debug!(client_id = %id, version, peers, "Edit applied");
                Ok(())
            }
            EditOutcome::Locked { holder } => {
                self.state.edits_rejected += 1;
                tracing::debug!(client_id = %id, holder = %holder, "Edit refused: locked");
                self.reply(&ServerMessage::edit_locked(holder))
            }
        }
    }

    /// Tear the session down. Safe to call more than once.
    ///
    /// Releases the editor lock if this session held it (announcing the change
    /// to the remaining peers), then deregisters the connection.
    pub async fn close(&mut self) {
        if self.state.close() == SessionPhase::Closed {
            return;
        }

        let id = self.state.client_id.clone();
        if self.hub.document().release_lock(&id).await {
            tracing::info!(client_id = %id, "Releasing editor lock held by departing client");
            self.broadcast_unlocked().await;
        }

        let clients = self.hub.registry().remove(&id).await;
        tracing::info!(
            client_id = %id,
            clients = clients,
            duration_secs = self.state.duration().as_secs(),
            messages = self.state.messages_received,
            edits = self.state.edits_applied,
            rejected_edits = self.state.edits_rejected,
            "Client disconnected"
        );
    }

    async fn broadcast_unlocked(&self) {
        self.hub
            .broadcaster()
            .broadcast(
                &ServerMessage::lock_status(LockStatus::unlocked()),
                Some(&self.state.client_id),
            )
            .await;
    }

    fn reply(&self, message: &ServerMessage) -> Result<()> {
        let frame = protocol::encode(message)?;
        self.handle.send(frame)?;
        Ok(())
    }
}

impl Drop for SessionHandler {
    // Covers sessions dropped without `close()`, e.g. a panicking connection task.
    fn drop(&mut self) {
        if self.state.close() == SessionPhase::Closed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let id = self.state.client_id.clone();
        let hub = self.hub.clone();
        tracing::warn!(client_id = %id, "Session dropped without close, cleaning up");

        runtime.spawn(async move {
            if hub.document().release_lock(&id).await {
                hub.broadcaster()
                    .broadcast(
                        &ServerMessage::lock_status(LockStatus::unlocked()),
                        Some(&id),
                    )
                    .await;
            }
            hub.registry().remove(&id).await;
        });
    }
}
