//! Tenant Cache - admin and operations server
//!
//! Builds the one cache manager for the process, runs the background tasks
//! against it and serves the admin API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_cache::api::create_router;
use tenant_cache::tasks::noop_cleanup;
use tenant_cache::{spawn_connection_cleanup_task, spawn_sweep_task, AppState, CacheManager, Config};

/// Main entry point for the tenant cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache manager
/// 4. Start the expiry sweep and connection cleanup tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenant_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tenant Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_tenants={}, max_estimated_entries={}, policy={:?}, port={}, sweep_interval={}s",
        config.cache.max_tenants,
        config.cache.max_estimated_entries,
        config.cache.capacity_policy,
        config.server_port,
        config.sweep_interval
    );

    let manager = Arc::new(CacheManager::new(config.cache.clone()));
    info!("Cache manager initialized");

    let sweep_handle = spawn_sweep_task(manager.clone(), config.sweep_interval);
    let connection_handle =
        spawn_connection_cleanup_task(noop_cleanup, config.connection_cleanup_interval);
    info!("Background tasks started");

    let app = create_router(AppState::new(manager));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(vec![sweep_handle, connection_handle]))
        .await
        .context("serving admin API")?;

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
    info!("Background tasks aborted");
}
