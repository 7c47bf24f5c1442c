//! Manual trigger for the post-sync request synchronization.

use clap::Args;

use crate::output::{self, OutputFormat};
use satchel_core::config::AppConfig;
use satchel_core::error::AppError;
use satchel_core::types::{DatasetId, TransferSessionId};

/// Arguments for the sync-hook command
#[derive(Debug, Args)]
pub struct SyncHookArgs {
    /// Dataset that finished syncing
    pub dataset: DatasetId,
    /// Limit to the changes of one transfer session
    #[arg(long)]
    pub transfer_session: Option<TransferSessionId>,
}

/// Execute the sync hook
pub async fn execute(
    args: &SyncHookArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (pool, stores) = super::connect(config).await?;

    let summary = super::bridge(&stores)
        .synchronize_content_requests(args.dataset, args.transfer_session)
        .await?;

    match format {
        OutputFormat::Json => output::print_item(&summary, format),
        OutputFormat::Table => {
            output::print_success("Content requests synchronized.");
            output::print_kv("Downloads created", &summary.downloads_created.to_string());
            output::print_kv("Removals created", &summary.removals_created.to_string());
            output::print_kv("Requests deleted", &summary.requests_deleted.to_string());
        }
    }

    pool.close().await;
    Ok(())
}
