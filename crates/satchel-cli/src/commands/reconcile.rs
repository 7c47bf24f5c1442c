//! Run a reconciliation pass from the command line.

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::output::{self, OutputFormat};
use satchel_core::config::AppConfig;
use satchel_core::error::AppError;
use satchel_core::types::human_size;
use satchel_service::{PassOutcome, ReconciliationPass};

/// Arguments for the reconcile command
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Skip importing metadata for unknown nodes
    #[arg(long)]
    pub skip_metadata: bool,
}

/// Execute one pass. Ctrl-C cancels it cleanly.
pub async fn execute(
    args: &ReconcileArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (pool, stores) = super::connect(config).await?;
    let ctx = super::engine_context(config, &stores).await?;

    let mut pass = ReconciliationPass::new(ctx)?;
    if args.skip_metadata {
        pass = pass.without_metadata_import();
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let outcome = pass.run(&cancel).await;
    watcher.abort();
    let outcome = outcome?;

    match format {
        OutputFormat::Json => output::print_item(&outcome, format),
        OutputFormat::Table => {
            let summary = outcome.summary();
            match &outcome {
                PassOutcome::Completed(_) => output::print_success("Reconciliation pass completed."),
                PassOutcome::InsufficientStorage { message, .. } => output::print_warning(message),
                PassOutcome::Cancelled(_) => output::print_warning("Reconciliation pass cancelled."),
            }
            output::print_kv("Requests reset", &summary.requests_reset.to_string());
            if let Some(metadata) = &summary.metadata {
                output::print_kv(
                    "Metadata imported",
                    &format!("{} of {}", metadata.imported, metadata.requested),
                );
            }
            output::print_kv("Downloads completed", &summary.downloads_completed.to_string());
            output::print_kv("Downloads failed", &summary.downloads_failed.to_string());
            output::print_kv("Removals completed", &summary.removals_completed.to_string());
            output::print_kv("Removals failed", &summary.removals_failed.to_string());
            output::print_kv("Downloads reclaimed", &summary.downloads_reclaimed.to_string());
            output::print_kv("Staging evicted", &human_size(summary.bytes_evicted as i64));
        }
    }

    pool.close().await;
    Ok(())
}
