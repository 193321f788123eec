//! Server configuration

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::document::DEFAULT_LOCK_TIMEOUT;
use crate::error::{Error, Result};
use crate::registry::DEFAULT_OUTBOUND_CAPACITY;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8765;

/// Default WebSocket path
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Default inbound message size cap (1 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1 << 20;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path that accepts WebSocket upgrades
    pub ws_path: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Editor lease duration
    pub lock_timeout: Duration,

    /// Largest inbound message accepted, in bytes
    pub max_message_size: usize,

    /// Frames queued per connection before further frames to it are dropped
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ws_path: DEFAULT_WS_PATH.to_string(),
            max_connections: 0, // Unlimited
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from `HOST`, `PORT`, `LOCK_TIMEOUT_SECS` and
    /// `MAX_CONNECTIONS` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got {:?}", raw)))?,
            None => DEFAULT_PORT,
        };
        config.bind_addr = resolve(&host, port)?;

        if let Some(raw) = lookup("LOCK_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<f64>().map_err(|_| {
                Error::Config(format!("LOCK_TIMEOUT_SECS must be a number, got {:?}", raw))
            })?;
            let timeout = Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|timeout| !timeout.is_zero())
                .ok_or_else(|| {
                    Error::Config(format!("LOCK_TIMEOUT_SECS must be positive, got {:?}", raw))
                })?;
            config.lock_timeout = timeout;
        }

        if let Some(raw) = lookup("MAX_CONNECTIONS") {
            config.max_connections = raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!("MAX_CONNECTIONS must be a count, got {:?}", raw))
            })?;
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket path; a leading `/` is added if missing
    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.ws_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the editor lease duration
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Set the inbound message size cap
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the per-connection outbound queue size
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::Config(format!("cannot resolve HOST {:?}: {}", host, e)))?
        .next()
        .ok_or_else(|| Error::Config(format!("HOST {:?} resolved to no address", host)))
}
