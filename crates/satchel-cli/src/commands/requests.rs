//! Content request CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use satchel_core::config::AppConfig;
use satchel_core::error::AppError;
use satchel_core::types::{ContentNodeId, FacilityId, InstanceId};
use satchel_database::store::ContentRequestStore;
use satchel_entity::request::{
    ContentRequest, RequestFilter, RequestKind, RequestReason, RequestStatus,
};

/// Arguments for request commands
#[derive(Debug, Args)]
pub struct RequestsArgs {
    /// Request subcommand
    #[command(subcommand)]
    pub command: RequestsCommand,
}

/// Request subcommands
#[derive(Debug, Subcommand)]
pub enum RequestsCommand {
    /// List requests, newest first
    List {
        /// Filter by kind (download, removal)
        #[arg(short, long)]
        kind: Option<RequestKind>,
        /// Filter by status
        #[arg(short, long)]
        status: Option<RequestStatus>,
        /// Filter by reason (sync_initiated, user_initiated)
        #[arg(short, long)]
        reason: Option<RequestReason>,
        /// Filter by facility
        #[arg(long)]
        facility: Option<FacilityId>,
        /// Maximum rows
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
    /// Request a download on behalf of a user
    Download {
        /// Facility the user belongs to
        facility: FacilityId,
        /// User id
        user: String,
        /// Content node to download
        node: ContentNodeId,
        /// Instance to try first
        #[arg(long)]
        source_instance: Option<InstanceId>,
    },
    /// Request a removal on behalf of a user
    Remove {
        /// Facility the user belongs to
        facility: FacilityId,
        /// User id
        user: String,
        /// Content node to remove
        node: ContentNodeId,
    },
}

/// Request display row for table output
#[derive(Debug, Serialize, Tabled)]
struct RequestRow {
    /// Request ID
    id: String,
    /// Download or removal
    kind: String,
    /// Status
    status: String,
    /// Reason
    reason: String,
    /// Content node
    node: String,
    /// Requesting model and id
    source: String,
    /// Requested at
    requested_at: String,
}

impl From<&ContentRequest> for RequestRow {
    fn from(r: &ContentRequest) -> Self {
        Self {
            id: r.id.to_string(),
            kind: r.kind.to_string(),
            status: r.status.to_string(),
            reason: r.reason.to_string(),
            node: r.contentnode_id.to_string(),
            source: format!("{}:{}", r.source_model, r.source_id),
            requested_at: r.requested_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute request commands
pub async fn execute(
    args: &RequestsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (pool, stores) = super::connect(config).await?;

    match &args.command {
        RequestsCommand::List {
            kind,
            status,
            reason,
            facility,
            limit,
        } => {
            let filter = RequestFilter {
                kind: *kind,
                status: *status,
                reason: *reason,
                facility_id: *facility,
                limit: Some(*limit),
            };
            let requests = stores.requests.list(&filter).await?;
            let rows: Vec<RequestRow> = requests.iter().map(RequestRow::from).collect();
            output::print_list(&rows, format);
        }
        RequestsCommand::Download {
            facility,
            user,
            node,
            source_instance,
        } => {
            let request = super::bridge(&stores)
                .request_user_download(*facility, user, *node, *source_instance, None)
                .await?;
            print_request(&request, format);
        }
        RequestsCommand::Remove {
            facility,
            user,
            node,
        } => {
            let request = super::bridge(&stores)
                .request_user_removal(*facility, user, *node)
                .await?;
            print_request(&request, format);
        }
    }

    pool.close().await;
    Ok(())
}

fn print_request(request: &ContentRequest, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_item(request, format),
        OutputFormat::Table => output::print_success(&format!(
            "{} request {} is {}",
            request.kind, request.id, request.status
        )),
    }
}
