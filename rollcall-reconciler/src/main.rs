//! rollcall-reconciler - Attendance reconciliation service
//!
//! Ingests attendance rosters, matches them against participations from the
//! external participation store, queues approve/reject decisions for review
//! and applies confirmed batches. Serves HTTP REST + SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rollcall_common::config::ConfigResolver;
use tokio::signal;
use tracing::{error, info, warn};

use rollcall_reconciler::logging;
use rollcall_reconciler::services::HttpParticipationStore;
use rollcall_reconciler::{build_router, AppState};

/// Command-line arguments for rollcall-reconciler
#[derive(Parser, Debug)]
#[command(name = "rollcall-reconciler")]
#[command(about = "Attendance-to-participation reconciliation service")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "ROLLCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides configuration)
    #[arg(long)]
    bind: Option<String>,

    /// Base URL of the participation store API (overrides configuration)
    #[arg(long)]
    store_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging first so config resolution warnings are visible
    let log_filter = logging::init();

    let resolver = ConfigResolver::new(args.config.clone());
    let mut config = resolver
        .resolve()
        .context("Failed to resolve configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(store_url) = args.store_url {
        config.store_base_url = store_url;
    }

    log_filter.apply_level(&config.logging.level);

    info!(
        "Starting rollcall-reconciler v{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("ROLLCALL_BUILD_ID")
    );
    match resolver.config_path() {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }
    info!(
        store = %config.store_base_url,
        threshold = config.policy.attendance_threshold,
        chunk_size = config.ingest.chunk_size,
        max_upload_bytes = config.ingest.max_upload_bytes,
        "Reconciler configuration"
    );

    let store = HttpParticipationStore::new(
        &config.store_base_url,
        Duration::from_millis(config.store.request_timeout_ms),
    )
    .context("Failed to create participation store client")?;

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.bind_address, config.port
            )
        })?;

    let state = AppState::new(config, Arc::new(store));

    // The store may come up later; reviewers can refresh from the API
    match state.service.refresh_participations(Default::default()).await {
        Ok(count) => info!(count, "Initial participation snapshot loaded"),
        Err(e) => warn!(error = %e, "Initial participation refresh failed"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
