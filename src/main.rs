//! OTLP → SQLite bridge server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - BRIDGE_HOST: Bind address (default: 0.0.0.0)
//! - BRIDGE_PORT: Port number (default: 5000)
//! - BRIDGE_DB_PATH: SQLite database file (default: /data/claude_monitoring.db)
//! - BRIDGE_BUSY_TIMEOUT_MS: Wait on a locked database before failing (default: 5000)
//! - BRIDGE_MAX_BODY_MB: Maximum request body size in MB (default: 16)
//! - RUST_LOG: Log level (default: info)

use sqlite_bridge::api::{body_limit_from_mb, run_server, ServerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlite_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = ServerConfig::default();

    // Parse configuration from environment
    let host = std::env::var("BRIDGE_HOST").unwrap_or(defaults.host);
    let port: u16 = std::env::var("BRIDGE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults.port);
    let db_path = std::env::var("BRIDGE_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or(defaults.db_path);
    let busy_timeout = std::env::var("BRIDGE_BUSY_TIMEOUT_MS")
        .ok()
        .and_then(|ms| ms.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(defaults.busy_timeout);
    let max_body_bytes = std::env::var("BRIDGE_MAX_BODY_MB")
        .ok()
        .and_then(|mb| body_limit_from_mb(&mb))
        .unwrap_or(defaults.max_body_bytes);

    let config = ServerConfig {
        host,
        port,
        db_path,
        busy_timeout,
        max_body_bytes,
    };

    tracing::info!("OTLP bridge configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!("  Database: {}", config.db_path.display());
    tracing::info!("  Busy timeout: {} ms", config.busy_timeout.as_millis());
    tracing::info!("  Max body: {} MB", config.max_body_bytes / (1024 * 1024));
    tracing::info!("  Version: {}", env!("CARGO_PKG_VERSION"));

    run_server(config).await
}
