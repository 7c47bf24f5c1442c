//! Pass results and the conditions that end a request or a pass early.

use serde::Serialize;

use satchel_core::types::{RequestId, human_size};

use crate::metadata::MetadataImportSummary;

fn readable(bytes: &u64) -> String {
    human_size(*bytes as i64)
}

/// Conditions the reconciliation pass reports instead of propagating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Nothing fits even after every relief action.
    #[error(
        "Insufficient storage: {} of content pending, {} more space needed",
        readable(.required),
        readable(.shortfall)
    )]
    InsufficientStorage {
        /// Bytes needed by every remaining download.
        required: u64,
        /// Bytes missing to fit them.
        shortfall: u64,
    },

    /// No candidate peer could serve a download.
    #[error("No peer available for request {request_id}")]
    NoPeerAvailable {
        /// The request that failed.
        request_id: RequestId,
    },

    /// The request's node has no metadata on this device.
    #[error("No metadata for the node of request {request_id}")]
    MissingMetadata {
        /// The request that failed.
        request_id: RequestId,
    },
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// In-progress rows left by an interrupted pass and reset to pending.
    pub requests_reset: u64,
    /// Metadata import results, when the importer ran.
    pub metadata: Option<MetadataImportSummary>,
    /// Downloads completed, including those already available.
    pub downloads_completed: u64,
    /// Downloads marked failed.
    pub downloads_failed: u64,
    /// Removals completed.
    pub removals_completed: u64,
    /// Removals marked failed.
    pub removals_failed: u64,
    /// Completed user downloads turned into removals to make room.
    pub downloads_reclaimed: u64,
    /// Bytes of staging fragments evicted.
    pub bytes_evicted: u64,
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    /// Every download with metadata was attempted.
    Completed(PassSummary),
    /// Downloads remain that cannot fit.
    InsufficientStorage {
        /// Bytes needed by every remaining download.
        required: u64,
        /// Bytes missing to fit them.
        shortfall: u64,
        /// Human-readable description, also stored as the device status.
        message: String,
        /// Work done before giving up.
        summary: PassSummary,
    },
    /// The cancellation token fired.
    Cancelled(PassSummary),
}

impl PassOutcome {
    /// The counters, whatever the outcome.
    pub fn summary(&self) -> &PassSummary {
        match self {
            Self::Completed(summary) | Self::Cancelled(summary) => summary,
            Self::InsufficientStorage { summary, .. } => summary,
        }
    }
}

/// How processing one download request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    /// Imported from a peer.
    Completed,
    /// The node was already on the device.
    AlreadyAvailable,
    /// Marked failed; retried on the next pass.
    Failed(ReconcileError),
    /// Returned to pending because the pass was cancelled.
    Cancelled,
}

/// Counters for one removal batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalSummary {
    /// Removals completed.
    pub completed: u64,
    /// Removals marked failed.
    pub failed: u64,
    /// Removals left alone because the node was downloaded again.
    pub skipped: u64,
    /// Bytes of files deleted from content storage.
    pub bytes_freed: u64,
}
