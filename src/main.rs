//! Listing Images - image asset server
//!
//! Serves uploads, thumbnails and variants over HTTP.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listing_images::{create_router, spawn_cache_sweeper, spawn_temp_cleanup, AppState, Config};

/// Main entry point for the image server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create storage, processor and cache
/// 4. Start background cache sweep and temp cleanup tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_images=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Listing Images server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_enabled={}, capacity={}, max_bytes={}, ttl={}s, storage={}, port={}",
        config.cache.enabled,
        config.cache.capacity,
        config.cache.max_size_bytes,
        config.cache.ttl.as_secs(),
        config.storage.base_path.display(),
        config.server_port
    );

    let state = AppState::from_config(&config).context("failed to initialize image storage")?;
    info!("Image pipeline initialized");

    let mut background = Vec::new();
    if state.service.cache().is_enabled() {
        background.push(spawn_cache_sweeper(
            state.service.cache().clone(),
            config.cache.cleanup_interval,
        ));
    }
    background.push(spawn_temp_cleanup(
        state.service.storage().clone(),
        config.temp_cleanup_interval,
        config.temp_max_age,
    ));
    info!("Background tasks started: {}", background.len());

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
