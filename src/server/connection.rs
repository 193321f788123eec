//! Per-connection task
//!
//! Pumps frames between one WebSocket and its [`SessionHandler`]: inbound
//! frames go to the session, frames queued on the session's handle (replies
//! and broadcasts alike) go out to the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::hub::CollabHub;
use crate::protocol::Frame;
use crate::registry::{ChannelHandle, DEFAULT_OUTBOUND_CAPACITY};
use crate::session::SessionHandler;

/// One upgraded WebSocket connection
pub struct Connection {
    socket: WebSocket,
    peer_addr: SocketAddr,
    hub: CollabHub,
    outbound_capacity: usize,
}

impl Connection {
    /// Wrap an upgraded socket
    pub fn new(socket: WebSocket, peer_addr: SocketAddr, hub: CollabHub) -> Self {
        Self {
            socket,
            peer_addr,
            hub,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    /// Set how many frames may wait for this socket
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    /// Run the connection to completion.
    ///
    /// Whatever ends the loop (peer close, socket error, failed send), the
    /// session is torn down through [`SessionHandler::close`].
    pub async fn run(mut self) {
        let (handle, mut outbound) = ChannelHandle::with_capacity(self.outbound_capacity);
        let mut session =
            SessionHandler::new(self.hub.clone(), Arc::new(handle)).with_peer_addr(self.peer_addr);

        if let Err(e) = self.pump(&mut session, &mut outbound).await {
            tracing::debug!(
                client_id = %session.client_id(),
                peer = %self.peer_addr,
                error = %e,
                "Connection error"
            );
        }

        session.close().await;
        let _ = self.socket.send(Message::Close(None)).await;
    }

    async fn pump(
        &mut self,
        session: &mut SessionHandler,
        outbound: &mut mpsc::Receiver<Frame>,
    ) -> Result<()> {
        session.start().await?;

        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else {
                        return Ok(());
                    };
                    self.socket.send(Message::Text(frame.as_str().into())).await?;
                }
                incoming = self.socket.recv() => {
                    let Some(incoming) = incoming else {
                        return Ok(());
                    };

                    match incoming? {
                        Message::Text(text) => session.handle_text(text.as_str()).await?,
                        Message::Binary(data) => session.handle_binary(&data).await?,
                        Message::Close(_) => return Ok(()),
                        // Pongs are answered by the transport
                        Message::Ping(_) | Message::Pong(_) => {}
                    }
                }
            }
        }
    }
}
