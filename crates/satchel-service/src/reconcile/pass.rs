//! The reconciliation pass.
//!
//! One pass repeatedly picks the oldest download that fits in the space
//! available right now. When nothing fits it takes the next relief action,
//! each at most once per pass, in this order:
//!
//! 1. process sync-initiated removals
//! 2. process user-initiated removals
//! 3. turn completed user downloads into removals, largest first
//! 4. evict staging fragments
//!
//! When all four are spent and still nothing fits, the pass stops and
//! raises the insufficient storage flag. Storage is recalculated before
//! every decision.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use satchel_core::result::AppResult;
use satchel_core::types::{RequestId, human_size};
use satchel_database::store::RemovalQuery;
use satchel_entity::device::DeviceStatus;
use satchel_entity::request::{
    AnnotatedRequest, ContentRequest, CreateContentRequest, RequestKind, RequestReason,
    RequestStatus,
};
use satchel_storage::StagingCache;

use super::download::DownloadExecutor;
use super::outcome::{DownloadResult, PassOutcome, PassSummary, ReconcileError, RemovalSummary};
use super::removal::RemovalExecutor;
use crate::context::EngineContext;
use crate::metadata::MetadataImporter;
use crate::storage::StorageCalculator;
use crate::storage::calculator::reclaimable_user_downloads;

/// Ways of making room, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliefAction {
    /// Process pending sync-initiated removals.
    SyncRemovals,
    /// Process pending user-initiated removals.
    UserRemovals,
    /// Remove completed user downloads nobody else needs.
    ReclaimUserDownloads,
    /// Delete partial transfers.
    EvictStaging,
}

impl ReliefAction {
    /// Every action in priority order.
    pub const ORDER: [ReliefAction; 4] = [
        Self::SyncRemovals,
        Self::UserRemovals,
        Self::ReclaimUserDownloads,
        Self::EvictStaging,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::SyncRemovals => "sync_removals",
            Self::UserRemovals => "user_removals",
            Self::ReclaimUserDownloads => "reclaim_user_downloads",
            Self::EvictStaging => "evict_staging",
        }
    }
}

/// Runs reconciliation passes. Not reentrant; callers serialize runs.
#[derive(Debug, Clone)]
pub struct ReconciliationPass {
    ctx: EngineContext,
    importer: Option<MetadataImporter>,
    downloads: DownloadExecutor,
    removals: RemovalExecutor,
    staging: StagingCache,
}

impl ReconciliationPass {
    /// Create a pass that imports missing metadata before downloading.
    pub fn new(ctx: EngineContext) -> AppResult<Self> {
        Ok(Self {
            importer: Some(MetadataImporter::new(ctx.clone())?),
            downloads: DownloadExecutor::new(ctx.clone()),
            removals: RemovalExecutor::new(ctx.clone()),
            staging: StagingCache::new(Arc::clone(&ctx.storage)),
            ctx,
        })
    }

    /// Skip the metadata import step.
    pub fn without_metadata_import(mut self) -> Self {
        self.importer = None;
        self
    }

    /// Run one pass.
    pub async fn run(&self, cancel: &CancellationToken) -> AppResult<PassOutcome> {
        let mut summary = PassSummary {
            requests_reset: self.ctx.requests.reset_in_progress().await?,
            ..PassSummary::default()
        };
        if summary.requests_reset > 0 {
            tracing::warn!(
                requests = summary.requests_reset,
                "Reset requests left in progress by an interrupted pass"
            );
        }

        if let Some(importer) = &self.importer {
            match importer.import_missing(cancel).await {
                Ok(imported) => summary.metadata = Some(imported),
                Err(e) => tracing::warn!(error = %e, "Metadata import failed, continuing with known nodes"),
            }
        }

        let query = self.ctx.download_query();
        let mut excluded: HashSet<RequestId> = HashSet::new();
        let mut reliefs = ReliefAction::ORDER.into_iter();

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Reconciliation pass cancelled");
                return Ok(PassOutcome::Cancelled(summary));
            }

            let candidates: Vec<AnnotatedRequest> = self
                .ctx
                .requests
                .incomplete_downloads(&query)
                .await?
                .into_iter()
                .filter(|r| r.has_metadata && !excluded.contains(&r.request.id))
                .collect();
            if candidates.is_empty() {
                break;
            }

            let calc = StorageCalculator::calculate(&self.ctx).await?;
            if let Some(next) = candidates
                .iter()
                .find(|r| r.size_bytes() <= calc.available_disk_space)
            {
                match self
                    .downloads
                    .process_download_request(&next.request, cancel)
                    .await?
                {
                    DownloadResult::Completed | DownloadResult::AlreadyAvailable => {
                        summary.downloads_completed += 1;
                    }
                    DownloadResult::Failed(reason) => {
                        tracing::debug!(request_id = %next.request.id, reason = %reason, "Excluding request for the rest of the pass");
                        excluded.insert(next.request.id);
                        summary.downloads_failed += 1;
                    }
                    DownloadResult::Cancelled => {
                        tracing::info!("Reconciliation pass cancelled");
                        return Ok(PassOutcome::Cancelled(summary));
                    }
                }
                continue;
            }

            let required: u64 = candidates.iter().map(AnnotatedRequest::size_bytes).sum();
            let shortfall = required.saturating_sub(calc.available_disk_space);

            let Some(relief) = reliefs.next() else {
                return self.insufficient_storage(required, shortfall, summary).await;
            };

            tracing::info!(
                relief = relief.as_str(),
                shortfall = %human_size(shortfall as i64),
                "No download fits, making room"
            );
            let freed = self.relieve(relief, shortfall, &mut summary).await?;
            if freed > 0 && self.ctx.reconciliation.retry_failed_within_pass {
                excluded.clear();
            }
        }

        if self
            .ctx
            .device_status
            .clear_status(DeviceStatus::InsufficientStorage)
            .await?
        {
            tracing::info!("Cleared insufficient storage status");
        }
        tracing::info!(
            downloads_completed = summary.downloads_completed,
            downloads_failed = summary.downloads_failed,
            removals_completed = summary.removals_completed,
            bytes_evicted = summary.bytes_evicted,
            "Reconciliation pass completed"
        );
        Ok(PassOutcome::Completed(summary))
    }

    async fn insufficient_storage(
        &self,
        required: u64,
        shortfall: u64,
        summary: PassSummary,
    ) -> AppResult<PassOutcome> {
        let message = ReconcileError::InsufficientStorage {
            required,
            shortfall,
        }
        .to_string();
        tracing::warn!(required, shortfall, "{message}");
        self.ctx
            .device_status
            .raise_status(DeviceStatus::InsufficientStorage, &message)
            .await?;
        Ok(PassOutcome::InsufficientStorage {
            required,
            shortfall,
            message,
            summary,
        })
    }

    /// Apply one relief action. Returns the bytes it freed.
    async fn relieve(
        &self,
        relief: ReliefAction,
        shortfall: u64,
        summary: &mut PassSummary,
    ) -> AppResult<u64> {
        let removed = match relief {
            ReliefAction::SyncRemovals => {
                self.process_removals(RequestReason::SyncInitiated).await?
            }
            ReliefAction::UserRemovals => {
                self.process_removals(RequestReason::UserInitiated).await?
            }
            ReliefAction::ReclaimUserDownloads => {
                let removals = self.reclaim_user_downloads(shortfall).await?;
                summary.downloads_reclaimed += removals.len() as u64;
                self.removals
                    .process_content_removal_requests(&removals)
                    .await?
            }
            ReliefAction::EvictStaging => {
                let evicted = self.staging.evict(shortfall).await?;
                summary.bytes_evicted += evicted;
                return Ok(evicted);
            }
        };

        summary.removals_completed += removed.completed;
        summary.removals_failed += removed.failed;
        Ok(removed.bytes_freed)
    }

    async fn process_removals(&self, reason: RequestReason) -> AppResult<RemovalSummary> {
        let removals: Vec<ContentRequest> = self
            .ctx
            .requests
            .incomplete_removals(&RemovalQuery::processable(reason))
            .await?
            .into_iter()
            .map(|r| r.request)
            .collect();
        self.removals
            .process_content_removal_requests(&removals)
            .await
    }

    /// Pick completed user downloads no other request needs, largest first,
    /// until `target` bytes are covered, and create a sync-initiated removal
    /// for each.
    async fn reclaim_user_downloads(&self, target: u64) -> AppResult<Vec<ContentRequest>> {
        let mut victims: Vec<AnnotatedRequest> = reclaimable_user_downloads(&self.ctx)
            .await?
            .into_iter()
            .filter(|candidate| candidate.size_bytes() > 0)
            .collect();
        victims.sort_by(|a, b| b.size_bytes().cmp(&a.size_bytes()));

        let mut covered = 0u64;
        let mut removals = Vec::new();
        for victim in victims {
            if covered >= target {
                break;
            }
            covered += victim.size_bytes();

            let download = victim.request;
            let data = CreateContentRequest {
                kind: RequestKind::Removal,
                facility_id: download.facility_id,
                contentnode_id: download.contentnode_id,
                source_model: download.source_model.clone(),
                source_id: download.source_id.clone(),
                reason: RequestReason::SyncInitiated,
                source_instance_id: None,
                metadata: None,
            };
            let (mut removal, created) = self.ctx.requests.get_or_create(&data).await?;
            if !created && !removal.status.is_incomplete() {
                self.ctx
                    .requests
                    .set_status(&[removal.id], RequestStatus::Pending)
                    .await?;
                removal.status = RequestStatus::Pending;
            }

            tracing::info!(
                request_id = %download.id,
                contentnode_id = %download.contentnode_id,
                size = %human_size(victim.total_size),
                "Reclaiming completed user download"
            );
            removals.push(removal);
        }
        Ok(removals)
    }
}
