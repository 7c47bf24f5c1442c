//! Database migration command.

use crate::output;
use satchel_core::config::AppConfig;
use satchel_core::error::AppError;

/// Run all pending migrations
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let (pool, _) = super::connect(config).await?;

    println!("Running database migrations...");
    satchel_database::migration::run_migrations(pool.pool()).await?;
    output::print_success("All migrations applied successfully.");

    pool.close().await;
    Ok(())
}
