//! CLI command definitions and dispatch.

pub mod migrate;
pub mod reconcile;
pub mod requests;
pub mod status;
pub mod sync_hook;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use satchel_core::config::AppConfig;
use satchel_core::error::AppError;
use satchel_database::{DatabasePool, PgStores};
use satchel_service::{AssignmentBridge, EngineContext};
use satchel_storage::LocalStorageProvider;

/// Satchel: content request reconciliation
#[derive(Debug, Parser)]
#[command(name = "satchel", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load on top of config/default.toml
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply database migrations
    Migrate,
    /// Inspect and create content requests
    Requests(requests::RequestsArgs),
    /// Run one reconciliation pass now
    Reconcile(reconcile::ReconcileArgs),
    /// Synchronize requests after a dataset finished syncing
    SyncHook(sync_hook::SyncHookArgs),
    /// Show storage accounting and device status flags
    Status,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.env)?;
        match &self.command {
            Commands::Migrate => migrate::execute(&config).await,
            Commands::Requests(args) => requests::execute(args, &config, self.format).await,
            Commands::Reconcile(args) => reconcile::execute(args, &config, self.format).await,
            Commands::SyncHook(args) => sync_hook::execute(args, &config, self.format).await,
            Commands::Status => status::execute(&config, self.format).await,
        }
    }
}

/// Helper: connect to the database and build the repositories
pub async fn connect(config: &AppConfig) -> Result<(DatabasePool, PgStores), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    let stores = PgStores::new(pool.pool().clone());
    Ok((pool, stores))
}

/// Helper: wire an engine context over the database and content directory
pub async fn engine_context(config: &AppConfig, stores: &PgStores) -> Result<EngineContext, AppError> {
    let storage = LocalStorageProvider::new(&config.storage.content_dir).await?;
    EngineContext::from_stores(stores, Arc::new(storage), config)
}

/// Helper: a bridge over the database, reading assignments from it
pub fn bridge(stores: &PgStores) -> AssignmentBridge {
    AssignmentBridge::new(
        Arc::new(stores.requests.clone()),
        Arc::new(stores.facilities.clone()),
        Arc::new(stores.peers.clone()),
    )
    .with_source(Arc::new(stores.assignments.clone()))
}
