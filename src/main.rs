//! collabpad server entry point
//!
//! Configuration comes from the environment:
//!
//! - `HOST` (default `0.0.0.0`)
//! - `PORT` (default `8765`)
//! - `LOCK_TIMEOUT_SECS` (default `3`)
//! - `MAX_CONNECTIONS` (default `0`, unlimited)
//! - `RUST_LOG` (default `info`)

use collabpad::{CollabServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env()?;
    let server = CollabServer::new(config);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
