use async_trait::async_trait;

use satchel_core::result::AppResult;
use satchel_core::types::{ContentNodeId, RequestId};
use satchel_entity::request::{
    AnnotatedRequest, ContentRequest, CreateContentRequest, RequestFilter, RequestKind,
    RequestReason, RequestStatus,
};

use super::{MemoryDatabase, MemoryState, now, oldest_first};
use crate::store::{ContentRequestStore, DownloadQuery, RemovalQuery};

impl MemoryState {
    fn annotate(&self, request: &ContentRequest, available_files: bool) -> AnnotatedRequest {
        AnnotatedRequest {
            request: request.clone(),
            has_metadata: self.nodes.contains_key(&request.contentnode_id),
            total_size: self.total_size(request.contentnode_id, available_files),
            is_learner_download: self.is_learner(request),
        }
    }

    fn has_other_source_download(&self, removal: &ContentRequest) -> bool {
        self.requests.iter().any(|d| {
            d.kind == RequestKind::Download
                && d.contentnode_id == removal.contentnode_id
                && !d.same_source(removal)
        })
    }

    fn is_admin_imported(&self, node_id: ContentNodeId) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|node| node.admin_imported)
    }
}

#[async_trait]
impl ContentRequestStore for MemoryDatabase {
    async fn find_by_id(&self, id: RequestId) -> AppResult<Option<ContentRequest>> {
        let state = self.state.read().await;
        Ok(state.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn get_or_create(
        &self,
        data: &CreateContentRequest,
    ) -> AppResult<(ContentRequest, bool)> {
        let mut state = self.state.write().await;
        let existing = state.requests.iter().find(|r| {
            r.kind == data.kind
                && r.source_model == data.source_model
                && r.source_id == data.source_id
                && r.contentnode_id == data.contentnode_id
        });
        if let Some(existing) = existing {
            return Ok((existing.clone(), false));
        }

        let created = data.clone().into_request(now());
        state.requests.push(created.clone());
        Ok((created, true))
    }

    async fn delete_for_source(
        &self,
        kind: RequestKind,
        source_model: &str,
        source_id: &str,
        node_ids: Option<&[ContentNodeId]>,
        statuses: &[RequestStatus],
    ) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let before = state.requests.len();
        state.requests.retain(|r| {
            let matches = r.kind == kind
                && r.source_model == source_model
                && r.source_id == source_id
                && node_ids.is_none_or(|ids| ids.contains(&r.contentnode_id))
                && statuses.contains(&r.status);
            !matches
        });
        Ok((before - state.requests.len()) as u64)
    }

    async fn nodes_for_source(
        &self,
        kind: RequestKind,
        source_model: &str,
        source_id: &str,
    ) -> AppResult<Vec<ContentNodeId>> {
        let state = self.state.read().await;
        let mut nodes: Vec<ContentNodeId> = Vec::new();
        for r in &state.requests {
            if r.kind == kind
                && r.source_model == source_model
                && r.source_id == source_id
                && !nodes.contains(&r.contentnode_id)
            {
                nodes.push(r.contentnode_id);
            }
        }
        Ok(nodes)
    }

    async fn requests_for_node(&self, node_id: ContentNodeId) -> AppResult<Vec<ContentRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .iter()
            .filter(|r| r.contentnode_id == node_id)
            .cloned()
            .collect())
    }

    async fn set_status(&self, ids: &[RequestId], status: RequestStatus) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for r in state.requests.iter_mut().filter(|r| ids.contains(&r.id)) {
            r.status = status;
            updated += 1;
        }
        Ok(updated)
    }

    async fn reset_in_progress(&self) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut reset = 0;
        for r in state
            .requests
            .iter_mut()
            .filter(|r| r.status == RequestStatus::InProgress)
        {
            r.status = RequestStatus::Pending;
            reset += 1;
        }
        Ok(reset)
    }

    async fn list(&self, filter: &RequestFilter) -> AppResult<Vec<ContentRequest>> {
        let state = self.state.read().await;
        let mut rows: Vec<ContentRequest> = state
            .requests
            .iter()
            .filter(|r| filter.kind.is_none_or(|k| r.kind == k))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.reason.is_none_or(|reason| r.reason == reason))
            .filter(|r| filter.facility_id.is_none_or(|f| r.facility_id == f))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        if let Some(limit) = filter.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn incomplete_downloads(
        &self,
        query: &DownloadQuery,
    ) -> AppResult<Vec<AnnotatedRequest>> {
        let state = self.state.read().await;
        let mut rows: Vec<AnnotatedRequest> = state
            .requests
            .iter()
            .filter(|r| r.kind == RequestKind::Download && r.status.is_incomplete())
            .filter(|r| !(query.exclude_sync_initiated && r.reason == RequestReason::SyncInitiated))
            .map(|r| state.annotate(r, false))
            .filter(|a| !(query.exclude_learner_downloads && a.is_learner_download))
            .collect();
        oldest_first(&mut rows);
        Ok(rows)
    }

    async fn completed_downloads(
        &self,
        reason: Option<RequestReason>,
    ) -> AppResult<Vec<AnnotatedRequest>> {
        let state = self.state.read().await;
        let mut rows: Vec<AnnotatedRequest> = state
            .requests
            .iter()
            .filter(|r| r.kind == RequestKind::Download && r.status == RequestStatus::Completed)
            .filter(|r| reason.is_none_or(|reason| r.reason == reason))
            .map(|r| state.annotate(r, true))
            .collect();
        oldest_first(&mut rows);
        Ok(rows)
    }

    async fn incomplete_removals(&self, query: &RemovalQuery) -> AppResult<Vec<AnnotatedRequest>> {
        let state = self.state.read().await;
        let mut rows: Vec<AnnotatedRequest> = state
            .requests
            .iter()
            .filter(|r| r.kind == RequestKind::Removal && r.status.is_incomplete())
            .filter(|r| query.reason.is_none_or(|reason| r.reason == reason))
            .filter(|r| !state.has_other_source_download(r))
            .filter(|r| query.include_protected || !state.is_admin_imported(r.contentnode_id))
            .map(|r| state.annotate(r, true))
            .collect();
        oldest_first(&mut rows);
        Ok(rows)
    }
}
