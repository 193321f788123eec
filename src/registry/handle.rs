//! Outbound connection handles
//!
//! A handle is the sending half of a connection as seen by everything outside
//! the connection task. Sending never blocks; the connection task drains its
//! queue into the socket on its own schedule. The queue is bounded: a peer
//! that stops reading loses frames instead of growing server memory.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::protocol::Frame;

/// Default number of frames queued per connection
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Error returned when a frame cannot be queued for a client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection task has gone away
    #[error("connection closed")]
    Closed,
    /// The client's outbound queue is full
    #[error("client lagging, outbound queue full")]
    Lagged,
}

/// Something a frame can be pushed to
pub trait ClientHandle: Send + Sync {
    /// Queue a frame for delivery
    fn send(&self, frame: Frame) -> Result<(), SendError>;
}

/// Handle backed by a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    tx: mpsc::Sender<Frame>,
}

impl ChannelHandle {
    /// Create a handle with the default queue size
    pub fn channel() -> (Self, mpsc::Receiver<Frame>) {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Create a handle queueing at most `capacity` frames (minimum 1)
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ClientHandle for ChannelHandle {
    fn send(&self, frame: Frame) -> Result<(), SendError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Lagged,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_after_receiver_dropped() {
        let (handle, rx) = ChannelHandle::channel();
        assert!(handle.send(Frame::from("{}")).is_ok());

        drop(rx);
        assert_eq!(handle.send(Frame::from("{}")), Err(SendError::Closed));
    }

    #[test]
    fn test_full_queue_reports_lag() {
        let (handle, mut rx) = ChannelHandle::with_capacity(2);
        assert!(handle.send(Frame::from("1")).is_ok());
        assert!(handle.send(Frame::from("2")).is_ok());
        assert_eq!(handle.send(Frame::from("3")), Err(SendError::Lagged));

        // Draining makes room again
        assert_eq!(rx.try_recv().unwrap().as_str(), "1");
        assert!(handle.send(Frame::from("3")).is_ok());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (handle, _rx) = ChannelHandle::with_capacity(0);
        assert!(handle.send(Frame::from("{}")).is_ok());
    }
}
