//! MediaHub server: keeps the media catalog in step with the blob store.
//!
//! Wires the catalog store, blob store, and transcoder together, runs an
//! initial sync and backfill, then repeats them on a cron schedule until
//! shutdown.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use mediahub_core::config::AppConfig;
use mediahub_core::error::AppError;
use mediahub_database::{DatabasePool, PgCatalogStore};
use mediahub_service::CatalogContext;
use mediahub_transcoder::FfmpegTranscoder;
use mediahub_worker::scheduler::{CronScheduler, run_startup_pass};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("MEDIAHUB_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting MediaHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Create data directories ──────────────────────────
    tokio::fs::create_dir_all(&config.transcoder.hls_root).await?;

    // ── Step 2: Database connection + migrations ─────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;
    mediahub_database::migration::run_migrations(db_pool.pool()).await?;

    // ── Step 3: Blob store and transcoder ────────────────────────
    let storage = mediahub_storage::build_provider(&config.storage).await?;

    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    match transcoder.probe().await {
        Ok(version) => tracing::info!(version = %version, "Transcoder available"),
        Err(e) => tracing::warn!(
            error = %e,
            "Transcoder unavailable; derived artifacts will be skipped until it is installed"
        ),
    }

    // ── Step 4: Catalog context and job handlers ─────────────────
    let store = Arc::new(PgCatalogStore::new(db_pool.pool().clone()));
    let worker_config = config.worker.clone();
    let ctx = CatalogContext::new(store, storage, Arc::new(transcoder), Arc::new(config));
    let executor = Arc::new(mediahub_worker::build_executor(ctx));

    // ── Step 5: Scheduler ────────────────────────────────────────
    let scheduler = if worker_config.enabled {
        let scheduler = CronScheduler::new(Arc::clone(&executor)).await?;
        scheduler.register_default_tasks(&worker_config).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    // ── Step 6: Startup pass ─────────────────────────────────────
    let startup = if worker_config.run_on_startup {
        let executor = Arc::clone(&executor);
        Some(tokio::spawn(async move {
            for (job_type, result) in run_startup_pass(&executor).await {
                match result {
                    Ok(run) => tracing::info!(job_type = %job_type, ?run, "Startup pass finished"),
                    Err(e) => tracing::error!(job_type = %job_type, error = %e, "Startup pass failed"),
                }
            }
        }))
    } else {
        None
    };

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }
    if let Some(handle) = startup {
        handle.abort();
    }
    db_pool.close().await;

    tracing::info!("MediaHub shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
