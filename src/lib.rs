//! collabpad: a shared text document over WebSocket
//!
//! Many clients view and edit one document in real time. Edits are
//! whole-document replacements with last-write-wins semantics; a leased,
//! non-blocking editor lock lets clients take turns without overwriting each
//! other.
//!
//! # Architecture
//!
//! ```text
//!   WebSocket ──► Connection ──► SessionHandler ──► SharedDocument
//!                    ▲               │
//!                    │               ▼
//!               ChannelHandle ◄── Broadcaster ◄── ConnectionRegistry
//! ```
//!
//! - [`document::SharedDocument`]: content, version and editor lease behind one mutex
//! - [`registry::ConnectionRegistry`]: client id to outbound handle
//! - [`broadcast::Broadcaster`]: fan-out over a registry snapshot
//! - [`session::SessionHandler`]: per-connection request dispatch
//! - [`server::CollabServer`]: axum listener and WebSocket upgrade
//!
//! # Example
//!
//! ```no_run
//! use collabpad::{CollabServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> collabpad::Result<()> {
//!     let server = CollabServer::new(ServerConfig::default());
//!     server.run().await
//! }
//! ```

pub mod broadcast;
pub mod document;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use broadcast::Broadcaster;
pub use document::{LockStatus, SharedDocument};
pub use error::{Error, Result};
pub use hub::CollabHub;
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{ClientId, ConnectionRegistry};
pub use server::{CollabServer, ServerConfig};
pub use session::SessionHandler;
