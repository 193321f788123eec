//! WebSocket transport
//!
//! Thin adapter between axum's WebSocket support and the session layer.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use listener::CollabServer;
