// S-11: Clippy allows for binary executable.
// Startup failures should terminate the process with a clear error, so
// panicking on initialization errors is acceptable here.
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! driftwatch service binary.
//!
//! Wires together the analyzer, ingest buffer, ingestion loop, Redis
//! persistence, and the HTTP API, then runs until SIGINT/SIGTERM.
//!
//! © 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use driftwatch_core::Config;
use driftwatch_server::redis_store::RedisStore;
use driftwatch_server::Server;

/// Bound on the drain-and-stop sequence at shutdown.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = async {
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    info!(
        http_addr = %config.http_addr,
        buffer_size = config.ingest_buffer_size,
        window_size = config.analytics_window,
        "starting driftwatch"
    );

    // Fail fast if Redis is unreachable at startup. The connection manager
    // handles reconnects after that.
    let store = RedisStore::connect(&config.redis_url, config.redis_connect_timeout)
        .await
        .context("redis connection failed")?;

    let server = Server::start(config, Arc::new(store))
        .await
        .context("server startup failed")?;

    shutdown_signal().await;
    info!("shutdown signal received, draining");
    server.shutdown(SHUTDOWN_DEADLINE).await;

    Ok(())
}
