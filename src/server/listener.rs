//! Collab server listener
//!
//! Binds the HTTP listener, upgrades WebSocket requests and spawns one
//! [`Connection`] per client. Plain HTTP requests get `200 OK` so load
//! balancers can health-check the same port.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::hub::CollabHub;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;

/// Collaborative document server
pub struct CollabServer {
    config: ServerConfig,
    hub: CollabHub,
    connection_semaphore: Option<Arc<Semaphore>>,
}

#[derive(Clone)]
struct RouterState {
    hub: CollabHub,
    max_message_size: usize,
    outbound_capacity: usize,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl CollabServer {
    /// Create a new server with a fresh document
    pub fn new(config: ServerConfig) -> Self {
        let hub = CollabHub::new(config.lock_timeout);
        Self::with_hub(config, hub)
    }

    /// Create a server around an existing hub
    pub fn with_hub(config: ServerConfig, hub: CollabHub) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub,
            connection_semaphore,
        }
    }

    /// Shared document and connection state
    pub fn hub(&self) -> &CollabHub {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the HTTP router.
    ///
    /// Must be served with connect info for [`SocketAddr`].
    pub fn router(&self) -> Router {
        let state = RouterState {
            hub: self.hub.clone(),
            max_message_size: self.config.max_message_size,
            outbound_capacity: self.config.outbound_capacity,
            connection_semaphore: self.connection_semaphore.clone(),
        };

        Router::new()
            .route(&self.config.ws_path, any(ws_entry))
            .fallback(health)
            .with_state(state)
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            path = %self.config.ws_path,
            lock_timeout_ms = self.config.lock_timeout.as_millis() as u64,
            "Collab server listening"
        );

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

        Ok(())
    }
}

async fn ws_entry(
    State(state): State<RouterState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    upgrade: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Ok(upgrade) = upgrade else {
        return health().await.into_response();
    };

    // Check connection limit
    let permit = match &state.connection_semaphore {
        Some(sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
            }
        },
        None => None,
    };

    tracing::debug!(peer = %peer_addr, "WebSocket upgrade");

    upgrade
        .max_message_size(state.max_message_size)
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            Connection::new(socket, peer_addr, state.hub)
                .outbound_capacity(state.outbound_capacity)
                .run()
                .await;
        })
}

async fn health() -> &'static str {
    "OK"
}
