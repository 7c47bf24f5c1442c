//! Satchel server: content request reconciliation.
//!
//! Main entry point that wires the crates together and runs the scheduled
//! reconciliation job until interrupted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use satchel_core::config::AppConfig;
use satchel_core::error::AppError;
use satchel_database::{DatabasePool, PgStores};
use satchel_service::EngineContext;
use satchel_storage::LocalStorageProvider;
use satchel_worker::{CONTENT_REQUESTS_JOB, ContentRequestsJob, CronScheduler, JobExecutor, JobTrigger};

#[tokio::main]
async fn main() {
    let env = std::env::var("SATCHEL_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
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
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Satchel");

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;
    satchel_database::migration::run_migrations(db.pool()).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Content storage ──────────────────────────────────
    let storage = LocalStorageProvider::new(&config.storage.content_dir).await?;
    tracing::info!(content_dir = %config.storage.content_dir, "Content storage ready");

    // ── Step 3: Engine wiring ────────────────────────────────────
    let stores = PgStores::new(db.pool().clone());
    let ctx = EngineContext::from_stores(&stores, Arc::new(storage), &config)?;

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ContentRequestsJob::new(ctx)));
    let executor = Arc::new(executor);

    // ── Step 4: Scheduler ────────────────────────────────────────
    let cancel = CancellationToken::new();
    let mut scheduler = CronScheduler::new(Arc::clone(&executor), cancel.clone()).await?;

    if config.worker.enabled {
        scheduler.register_default_tasks(&config.worker).await?;
        scheduler.start().await?;
        if config.worker.run_on_startup {
            scheduler.trigger_now(CONTENT_REQUESTS_JOB, JobTrigger::Startup);
        }
    } else {
        tracing::warn!("Worker disabled, no reconciliation passes will run");
    }

    // ── Step 5: Wait for shutdown ────────────────────────────────
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))?;
    tracing::info!("Shutdown signal received");

    if config.worker.enabled {
        scheduler.shutdown().await?;
    } else {
        cancel.cancel();
    }
    db.close().await;

    tracing::info!("Satchel stopped");
    Ok(())
}
