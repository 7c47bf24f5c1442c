//! Storage accounting and device status flags.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use satchel_core::config::AppConfig;
use satchel_core::error::AppError;
use satchel_core::types::human_size;
use satchel_database::store::DeviceStatusStore;
use satchel_entity::device::DeviceStatusRecord;
use satchel_service::StorageCalculator;

/// Status flag display row
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    /// Flag name
    status: String,
    /// Detail message
    detail: String,
    /// Last raised
    updated_at: String,
}

impl From<&DeviceStatusRecord> for StatusRow {
    fn from(r: &DeviceStatusRecord) -> Self {
        Self {
            status: r.status.as_str().to_string(),
            detail: r.detail.clone(),
            updated_at: r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    storage: StorageCalculator,
    statuses: &'a [DeviceStatusRecord],
}

/// Show the current storage picture and raised flags
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let (pool, stores) = super::connect(config).await?;
    let ctx = super::engine_context(config, &stores).await?;

    let storage = StorageCalculator::calculate(&ctx).await?;
    let statuses = stores.device_status.current_statuses().await?;

    match format {
        OutputFormat::Json => output::print_item(
            &StatusReport {
                storage,
                statuses: &statuses,
            },
            format,
        ),
        OutputFormat::Table => {
            let size = |bytes: u64| human_size(bytes as i64);
            println!("Storage:");
            output::print_kv("Pending downloads", &size(storage.incomplete_downloads_size));
            output::print_kv("Completed downloads", &size(storage.completed_downloads_size));
            output::print_kv("Disk free", &size(storage.disk_free));
            output::print_kv("Available", &size(storage.available_disk_space));
            output::print_kv("Sync removals", &size(storage.sync_removals_size));
            output::print_kv("User removals", &size(storage.user_removals_size));
            output::print_kv("User downloads", &size(storage.user_downloads_size));
            output::print_kv(
                "Additional space needed",
                &human_size(storage.get_additional_free_space_needed()),
            );
            println!();
            let rows: Vec<StatusRow> = statuses.iter().map(StatusRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    pool.close().await;
    Ok(())
}
