//! Fan-out to connected clients
//!
//! A message is encoded once and the same [`Frame`] is queued on every handle
//! in a registry snapshot. Delivery failures stay local to the failing peer:
//! a dead connection is cleaned up by its own disconnect path, not here.

use std::sync::Arc;

use crate::protocol::{self, Frame, ServerMessage};
use crate::registry::{ClientId, ConnectionRegistry, SendError};

/// Sends messages to every registered connection
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Send `message` to everyone except `exclude`.
    ///
    /// Returns the number of peers the frame was queued for.
    pub async fn broadcast(&self, message: &ServerMessage, exclude: Option<&ClientId>) -> usize {
        let frame = match protocol::encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode broadcast message");
                return 0;
            }
        };

        self.broadcast_frame(frame, exclude).await
    }

    /// Send a pre-encoded frame to everyone except `exclude`
    pub async fn broadcast_frame(&self, frame: Frame, exclude: Option<&ClientId>) -> usize {
        let snapshot = self.registry.snapshot().await;
        let mut delivered = 0;

        for (id, handle) in snapshot.iter() {
            if Some(id) == exclude {
                continue;
            }

            match handle.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(SendError::Lagged) => {
                    tracing::warn!(client_id = %id, "Client lagging, dropped broadcast frame");
                }
                Err(e) => {
                    tracing::debug!(client_id = %id, error = %e, "Dropped broadcast frame");
                }
            }
        }

        delivered
    }
}
