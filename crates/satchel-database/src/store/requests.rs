//! Content request persistence and the annotated request queries.

use async_trait::async_trait;

use satchel_core::config::DeviceSettings;
use satchel_core::result::AppResult;
use satchel_core::types::{ContentNodeId, RequestId};
use satchel_entity::request::{
    AnnotatedRequest, ContentRequest, CreateContentRequest, RequestFilter, RequestKind,
    RequestReason, RequestStatus,
};

/// Filters applied to the incomplete downloads query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadQuery {
    /// Drop downloads whose source is a facility user without roles.
    pub exclude_learner_downloads: bool,
    /// Drop sync-initiated downloads.
    pub exclude_sync_initiated: bool,
}

impl DownloadQuery {
    /// The filters a device's settings call for. Learner downloads are kept
    /// on a subset-of-users device, where they are the reason the device
    /// exists.
    pub fn for_device(settings: &DeviceSettings) -> Self {
        Self {
            exclude_learner_downloads: !settings.allow_learner_download_resources
                && !settings.subset_of_users_device,
            exclude_sync_initiated: !settings.enable_automatic_download,
        }
    }
}

/// Filters applied to the incomplete removals query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalQuery {
    /// Only removals with this reason.
    pub reason: Option<RequestReason>,
    /// Keep removals that target admin-imported nodes. These free no space
    /// but still need to be closed out by the removal executor.
    pub include_protected: bool,
}

impl RemovalQuery {
    /// Removals with the given reason that would actually free space.
    pub fn reclaimable(reason: RequestReason) -> Self {
        Self {
            reason: Some(reason),
            include_protected: false,
        }
    }

    /// Every removal with the given reason the executor should look at.
    pub fn processable(reason: RequestReason) -> Self {
        Self {
            reason: Some(reason),
            include_protected: true,
        }
    }
}

/// Durable storage of [`ContentRequest`] rows.
///
/// The annotated queries compute `has_metadata`, `total_size` and
/// `is_learner_download` from live content state on every call. Sizes treat
/// unknown file sizes as zero and count each local file once per request.
#[async_trait]
pub trait ContentRequestStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a request by id.
    async fn find_by_id(&self, id: RequestId) -> AppResult<Option<ContentRequest>>;

    /// Return the request for `(kind, source_model, source_id,
    /// contentnode_id)`, creating it as pending if absent. An existing row is
    /// returned untouched. The flag is `true` when a row was created.
    async fn get_or_create(&self, data: &CreateContentRequest)
    -> AppResult<(ContentRequest, bool)>;

    /// Delete requests of `kind` from one source, limited to `node_ids` when
    /// given, whose status is one of `statuses`. Returns the rows deleted.
    async fn delete_for_source(
        &self,
        kind: RequestKind,
        source_model: &str,
        source_id: &str,
        node_ids: Option<&[ContentNodeId]>,
        statuses: &[RequestStatus],
    ) -> AppResult<u64>;

    /// Nodes that one source has requests of `kind` for, in any status.
    async fn nodes_for_source(
        &self,
        kind: RequestKind,
        source_model: &str,
        source_id: &str,
    ) -> AppResult<Vec<ContentNodeId>>;

    /// Every request targeting a node, any kind and status.
    async fn requests_for_node(&self, node_id: ContentNodeId) -> AppResult<Vec<ContentRequest>>;

    /// Set the status of the given requests. Returns the rows updated.
    async fn set_status(&self, ids: &[RequestId], status: RequestStatus) -> AppResult<u64>;

    /// Return every in-progress request to pending. Returns the rows reset.
    async fn reset_in_progress(&self) -> AppResult<u64>;

    /// List requests, newest first.
    async fn list(&self, filter: &RequestFilter) -> AppResult<Vec<ContentRequest>>;

    /// Pending and failed downloads, oldest first. Sizes count the node's
    /// unavailable files plus its parent's unavailable thumbnails.
    async fn incomplete_downloads(&self, query: &DownloadQuery) -> AppResult<Vec<AnnotatedRequest>>;

    /// Completed downloads, oldest first. Sizes count available files.
    async fn completed_downloads(
        &self,
        reason: Option<RequestReason>,
    ) -> AppResult<Vec<AnnotatedRequest>>;

    /// Pending and failed removals, oldest first, excluding nodes that still
    /// have a download request from another source. Sizes count available
    /// files.
    async fn incomplete_removals(&self, query: &RemovalQuery) -> AppResult<Vec<AnnotatedRequest>>;
}
