//! Free space accounting for the reconciliation pass.

use serde::Serialize;

use satchel_core::result::AppResult;
use satchel_core::types::human_size;
use satchel_database::store::RemovalQuery;
use satchel_entity::request::{AnnotatedRequest, RequestKind, RequestReason};

use crate::context::EngineContext;

/// A snapshot of how much space downloads need and how much could be made
/// available. Build a new one after every action that changes requests or
/// disk contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageCalculator {
    /// Bytes still needed by pending and failed downloads.
    pub incomplete_downloads_size: u64,
    /// Bytes held by completed downloads.
    pub completed_downloads_size: u64,
    /// Free space reported for the content directory.
    pub disk_free: u64,
    /// Free space usable right now, after the auto-download quota.
    pub available_disk_space: u64,
    /// Bytes pending sync-initiated removals would free.
    pub sync_removals_size: u64,
    /// Bytes pending user-initiated removals would free.
    pub user_removals_size: u64,
    /// Bytes held by completed user-initiated downloads that no other
    /// download request refers to. Shared downloads are never reclaimed.
    pub user_downloads_size: u64,
}

fn total(rows: &[AnnotatedRequest]) -> u64 {
    rows.iter().map(AnnotatedRequest::size_bytes).sum()
}

/// Completed user-initiated downloads whose node no other download request
/// refers to.
pub(crate) async fn reclaimable_user_downloads(
    ctx: &EngineContext,
) -> AppResult<Vec<AnnotatedRequest>> {
    let mut reclaimable = Vec::new();
    for candidate in ctx
        .requests
        .completed_downloads(Some(RequestReason::UserInitiated))
        .await?
    {
        let others = ctx
            .requests
            .requests_for_node(candidate.request.contentnode_id)
            .await?;
        let shared = others
            .iter()
            .any(|r| r.kind == RequestKind::Download && r.id != candidate.request.id);
        if !shared {
            reclaimable.push(candidate);
        }
    }
    Ok(reclaimable)
}

impl StorageCalculator {
    /// Read the current state of requests and disk.
    pub async fn calculate(ctx: &EngineContext) -> AppResult<Self> {
        let incomplete = ctx
            .requests
            .incomplete_downloads(&ctx.download_query())
            .await?;
        let completed = ctx.requests.completed_downloads(None).await?;
        let sync_removals = ctx
            .requests
            .incomplete_removals(&RemovalQuery::reclaimable(RequestReason::SyncInitiated))
            .await?;
        let user_removals = ctx
            .requests
            .incomplete_removals(&RemovalQuery::reclaimable(RequestReason::UserInitiated))
            .await?;
        let user_downloads = reclaimable_user_downloads(ctx).await?;

        let disk_free = ctx.storage.capacity().await?.available_bytes;
        let completed_downloads_size = total(&completed);
        let available_disk_space = if ctx.settings.set_limit_for_autodownload {
            let quota_left = ctx
                .settings
                .limit_for_autodownload
                .saturating_sub(completed_downloads_size);
            disk_free.min(quota_left)
        } else {
            disk_free
        };

        let calculator = Self {
            incomplete_downloads_size: total(&incomplete),
            completed_downloads_size,
            disk_free,
            available_disk_space,
            sync_removals_size: total(&sync_removals),
            user_removals_size: total(&user_removals),
            user_downloads_size: total(&user_downloads),
        };

        tracing::debug!(
            incomplete = %human_size(calculator.incomplete_downloads_size as i64),
            available = %human_size(calculator.available_disk_space as i64),
            free = %human_size(calculator.free_space() as i64),
            "Calculated storage"
        );
        Ok(calculator)
    }

    /// Space the relief actions could free.
    pub fn recoverable_space(&self) -> u64 {
        self.sync_removals_size + self.user_removals_size + self.user_downloads_size
    }

    /// Usable space plus everything that could be freed.
    pub fn free_space(&self) -> u64 {
        self.available_disk_space + self.recoverable_space()
    }

    /// Whether every incomplete download could fit.
    pub fn is_space_sufficient(&self) -> bool {
        self.free_space() > self.incomplete_downloads_size
    }

    /// Bytes still missing to fit every incomplete download. Negative when
    /// there is a surplus.
    pub fn get_additional_free_space_needed(&self) -> i64 {
        self.incomplete_downloads_size as i64 - self.free_space() as i64
    }
}
