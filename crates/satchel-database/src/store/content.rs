//! Content tree access.

use async_trait::async_trait;

use satchel_core::result::AppResult;
use satchel_core::types::{ChannelId, ContentNodeId};
use satchel_entity::content::{ContentNode, LocalFile, NodeMetadata};

/// The local content tree and file availability.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a node by id.
    async fn get_node(&self, id: ContentNodeId) -> AppResult<Option<ContentNode>>;

    /// Find several nodes. Unknown ids are skipped.
    async fn get_nodes(&self, ids: &[ContentNodeId]) -> AppResult<Vec<ContentNode>>;

    /// Files an import of the node has to provide: the node's own files and
    /// its parent's thumbnails, each local file once.
    async fn files_for_import(&self, id: ContentNodeId) -> AppResult<Vec<LocalFile>>;

    /// Mark local files as present on disk.
    async fn mark_files_available(&self, checksums: &[String]) -> AppResult<()>;

    /// Mark a node as available.
    async fn mark_node_available(&self, id: ContentNodeId) -> AppResult<()>;

    /// Mark the listed nodes of one channel unavailable. Local files no
    /// longer used by any available node are marked unavailable and
    /// returned so the caller can delete them from disk.
    ///
    /// Only the explicit node list is touched; an empty list is a no-op.
    async fn delete_content(
        &self,
        channel_id: ChannelId,
        node_ids: &[ContentNodeId],
    ) -> AppResult<Vec<LocalFile>>;

    /// Insert the rows of a peer metadata document. Existing rows keep their
    /// availability flags. Returns the number of nodes inserted.
    async fn import_metadata(&self, doc: &NodeMetadata) -> AppResult<usize>;
}
