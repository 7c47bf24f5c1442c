//! Removing content for removal requests.

use std::collections::{BTreeMap, HashMap, HashSet};

use satchel_core::result::AppResult;
use satchel_core::types::{ChannelId, ContentNodeId, RequestId};
use satchel_entity::content::ContentNode;
use satchel_entity::request::{ContentRequest, RequestKind, RequestStatus};

use super::outcome::RemovalSummary;
use crate::bridge::service::SUPERSEDED_STATUSES;
use crate::context::EngineContext;

/// Deletes content on behalf of removal requests.
#[derive(Debug, Clone)]
pub struct RemovalExecutor {
    ctx: EngineContext,
}

#[derive(Debug, Default)]
struct ChannelGroup {
    nodes: Vec<ContentNodeId>,
    requests: Vec<RequestId>,
}

impl RemovalExecutor {
    /// Create an executor.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Process a batch of removal requests.
    ///
    /// Removable nodes (available and not admin-imported) are deleted one
    /// channel at a time with an explicit node list. A failing channel marks
    /// its requests failed and the batch moves on. Requests whose nodes are
    /// already gone or protected are completed without deleting anything.
    /// Every completed removal takes the same source's download request for
    /// the node with it.
    pub async fn process_content_removal_requests(
        &self,
        removals: &[ContentRequest],
    ) -> AppResult<RemovalSummary> {
        let mut summary = RemovalSummary::default();
        let mut actionable = Vec::new();
        for removal in removals.iter().filter(|r| r.kind == RequestKind::Removal) {
            if self.superseded_by_download(removal).await? {
                tracing::debug!(
                    request_id = %removal.id,
                    contentnode_id = %removal.contentnode_id,
                    "Node downloaded again by another source, leaving removal alone"
                );
                summary.skipped += 1;
            } else {
                actionable.push(removal);
            }
        }
        if actionable.is_empty() {
            return Ok(summary);
        }

        let node_ids: Vec<ContentNodeId> = actionable.iter().map(|r| r.contentnode_id).collect();
        let nodes: HashMap<ContentNodeId, ContentNode> = self
            .ctx
            .content
            .get_nodes(&node_ids)
            .await?
            .into_iter()
            .map(|n| (n.id, n))
            .collect();

        let mut groups: BTreeMap<ChannelId, ChannelGroup> = BTreeMap::new();
        let mut nothing_to_do = Vec::new();
        for removal in &actionable {
            match nodes.get(&removal.contentnode_id) {
                Some(node) if node.available && !node.admin_imported => {
                    let group = groups.entry(node.channel_id).or_default();
                    if !group.nodes.contains(&node.id) {
                        group.nodes.push(node.id);
                    }
                    group.requests.push(removal.id);
                }
                _ => nothing_to_do.push(removal.id),
            }
        }

        let mut completed: HashSet<RequestId> = HashSet::new();
        for (channel_id, group) in groups {
            match self.remove_channel_nodes(channel_id, &group).await {
                Ok(bytes) => {
                    summary.bytes_freed += bytes;
                    summary.completed += group.requests.len() as u64;
                    completed.extend(group.requests.iter().copied());
                }
                Err(e) => {
                    tracing::error!(
                        channel_id = %channel_id,
                        nodes = group.nodes.len(),
                        error = %e,
                        "Failed to remove channel content"
                    );
                    self.ctx
                        .requests
                        .set_status(&group.requests, RequestStatus::Failed)
                        .await?;
                    summary.failed += group.requests.len() as u64;
                }
            }
        }

        if !nothing_to_do.is_empty() {
            self.ctx
                .requests
                .set_status(&nothing_to_do, RequestStatus::Completed)
                .await?;
            summary.completed += nothing_to_do.len() as u64;
            completed.extend(nothing_to_do);
        }

        for removal in actionable.iter().filter(|r| completed.contains(&r.id)) {
            self.ctx
                .requests
                .delete_for_source(
                    RequestKind::Download,
                    &removal.source_model,
                    &removal.source_id,
                    Some(&[removal.contentnode_id]),
                    &SUPERSEDED_STATUSES,
                )
                .await?;
        }

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            bytes_freed = summary.bytes_freed,
            "Processed content removals"
        );
        Ok(summary)
    }

    /// Whether another source completed a download of the node after the
    /// removal was requested.
    async fn superseded_by_download(&self, removal: &ContentRequest) -> AppResult<bool> {
        let requests = self
            .ctx
            .requests
            .requests_for_node(removal.contentnode_id)
            .await?;
        Ok(requests.iter().any(|r| {
            r.kind == RequestKind::Download
                && r.status == RequestStatus::Completed
                && !r.same_source(removal)
                && r.requested_at > removal.requested_at
        }))
    }

    async fn remove_channel_nodes(
        &self,
        channel_id: ChannelId,
        group: &ChannelGroup,
    ) -> AppResult<u64> {
        self.ctx
            .requests
            .set_status(&group.requests, RequestStatus::InProgress)
            .await?;

        let orphaned = self
            .ctx
            .content
            .delete_content(channel_id, &group.nodes)
            .await?;

        let mut freed = 0;
        for file in &orphaned {
            self.ctx.storage.delete(&file.relative_path()).await?;
            freed += file.size_bytes();
        }

        self.ctx
            .requests
            .set_status(&group.requests, RequestStatus::Completed)
            .await?;

        tracing::info!(
            channel_id = %channel_id,
            nodes = group.nodes.len(),
            files_deleted = orphaned.len(),
            bytes_freed = freed,
            "Removed channel content"
        );
        Ok(freed)
    }
}
