//! Content request entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use satchel_core::types::{ContentNodeId, FacilityId, InstanceId, RequestId};

use super::status::{RequestKind, RequestReason, RequestStatus};
use crate::facility::FACILITY_USER_MODEL;

/// A durable request to download or remove one content node on behalf of
/// one source entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ContentRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Download or removal.
    pub kind: RequestKind,
    /// Facility that owns the request.
    pub facility_id: FacilityId,
    /// Target node. May reference a node whose metadata is not imported yet.
    pub contentnode_id: ContentNodeId,
    /// Model name of the originating entity.
    pub source_model: String,
    /// Identifier of the originating entity.
    pub source_id: String,
    /// Why the request exists.
    pub reason: RequestReason,
    /// Processing status.
    pub status: RequestStatus,
    /// When the request was made. Drives oldest-first ordering.
    pub requested_at: DateTime<Utc>,
    /// Peer most likely to have the content (downloads only).
    pub source_instance_id: Option<InstanceId>,
    /// Client-supplied metadata for user downloads.
    pub metadata: Option<serde_json::Value>,
}

impl ContentRequest {
    /// Whether this row is a download request.
    pub fn is_download(&self) -> bool {
        self.kind == RequestKind::Download
    }

    /// Whether two requests come from the same source entity.
    pub fn same_source(&self, other: &ContentRequest) -> bool {
        self.source_model == other.source_model && self.source_id == other.source_id
    }

    /// Whether the source is a facility user.
    pub fn is_user_source(&self) -> bool {
        self.source_model == FACILITY_USER_MODEL
    }
}

/// Data required to get-or-create a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContentRequest {
    /// Download or removal.
    pub kind: RequestKind,
    /// Owning facility.
    pub facility_id: FacilityId,
    /// Target node.
    pub contentnode_id: ContentNodeId,
    /// Model name of the originating entity.
    pub source_model: String,
    /// Identifier of the originating entity.
    pub source_id: String,
    /// Why the request exists.
    pub reason: RequestReason,
    /// Preferred peer (downloads only).
    pub source_instance_id: Option<InstanceId>,
    /// Client-supplied metadata (downloads only).
    pub metadata: Option<serde_json::Value>,
}

impl CreateContentRequest {
    /// Build the row a successful create inserts.
    pub fn into_request(self, requested_at: DateTime<Utc>) -> ContentRequest {
        let is_download = self.kind == RequestKind::Download;
        ContentRequest {
            id: RequestId::new(),
            kind: self.kind,
            facility_id: self.facility_id,
            contentnode_id: self.contentnode_id,
            source_model: self.source_model,
            source_id: self.source_id,
            reason: self.reason,
            status: RequestStatus::Pending,
            requested_at,
            source_instance_id: self.source_instance_id.filter(|_| is_download),
            metadata: self.metadata.filter(|_| is_download),
        }
    }
}

/// A request together with the values computed from live content state.
///
/// `total_size` is never persisted; every query recomputes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnnotatedRequest {
    /// The underlying row.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: ContentRequest,
    /// Whether the target node exists in the content store.
    pub has_metadata: bool,
    /// Bytes attributed to the request. Never negative.
    pub total_size: i64,
    /// Whether the source is a facility user without any role.
    pub is_learner_download: bool,
}

impl AnnotatedRequest {
    /// The total size as an unsigned byte count.
    pub fn size_bytes(&self) -> u64 {
        self.total_size.max(0) as u64
    }
}

/// Filter for listing requests from the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    /// Only this kind.
    pub kind: Option<RequestKind>,
    /// Only this status.
    pub status: Option<RequestStatus>,
    /// Only this reason.
    pub reason: Option<RequestReason>,
    /// Only this facility.
    pub facility_id: Option<FacilityId>,
    /// Maximum rows returned.
    pub limit: Option<i64>,
}
