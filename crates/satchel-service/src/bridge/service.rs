//! Turning assignment changes into content requests.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use satchel_core::result::AppResult;
use satchel_core::types::{ContentNodeId, DatasetId, FacilityId, InstanceId, TransferSessionId};
use satchel_database::store::{AssignmentSource, ContentRequestStore, FacilityDirectory, PeerRegistry};
use satchel_entity::assignment::{Assignment, AssignmentScope, RemovableAssignment};
use satchel_entity::request::{
    ContentRequest, CreateContentRequest, RequestKind, RequestReason, RequestStatus,
};

/// Statuses of an opposite-kind request that a new request supersedes.
/// In-progress rows are left to finish.
pub(crate) const SUPERSEDED_STATUSES: [RequestStatus; 3] = [
    RequestStatus::Pending,
    RequestStatus::Failed,
    RequestStatus::Completed,
];

/// Changes made by one synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Download requests created.
    pub downloads_created: u64,
    /// Removal requests created.
    pub removals_created: u64,
    /// Opposite-kind requests deleted.
    pub requests_deleted: u64,
}

/// Keeps content requests in step with assignments delivered by sync.
#[derive(Clone)]
pub struct AssignmentBridge {
    requests: Arc<dyn ContentRequestStore>,
    facilities: Arc<dyn FacilityDirectory>,
    peers: Arc<dyn PeerRegistry>,
    sources: Vec<Arc<dyn AssignmentSource>>,
}

impl std::fmt::Debug for AssignmentBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("AssignmentBridge")
            .field("sources", &sources)
            .finish()
    }
}

impl AssignmentBridge {
    /// Create a bridge without assignment sources.
    pub fn new(
        requests: Arc<dyn ContentRequestStore>,
        facilities: Arc<dyn FacilityDirectory>,
        peers: Arc<dyn PeerRegistry>,
    ) -> Self {
        Self {
            requests,
            facilities,
            peers,
            sources: Vec::new(),
        }
    }

    /// Register an assignment source.
    pub fn with_source(mut self, source: Arc<dyn AssignmentSource>) -> Self {
        tracing::info!(source = source.name(), "Registered assignment source");
        self.sources.push(source);
        self
    }

    /// Bring content requests in line with the assignments in a dataset.
    ///
    /// Called once per completed sync on the receiving side. Removals are
    /// handled before downloads. Calling it again with unchanged assignments
    /// changes nothing.
    pub async fn synchronize_content_requests(
        &self,
        dataset_id: DatasetId,
        transfer_session_id: Option<TransferSessionId>,
    ) -> AppResult<SyncSummary> {
        let Some(facility) = self.facilities.facility_for_dataset(dataset_id).await? else {
            tracing::warn!(dataset_id = %dataset_id, "No facility for dataset, skipping content request sync");
            return Ok(SyncSummary::default());
        };

        let scope = match transfer_session_id {
            Some(id) => AssignmentScope::TransferSession(id),
            None => AssignmentScope::Dataset(dataset_id),
        };
        let source_instance_id = self.source_instance(transfer_session_id).await?;

        let mut downloads = Vec::new();
        let mut removals = Vec::new();
        for source in &self.sources {
            removals.extend(source.removable(scope).await?);
            downloads.extend(source.downloadable(scope).await?);
        }

        let assigned: HashSet<(String, String, ContentNodeId)> = downloads
            .iter()
            .map(|a| (a.source_model.clone(), a.source_id.clone(), a.contentnode_id))
            .collect();

        let mut summary = SyncSummary::default();
        for removal in &removals {
            self.apply_removal(facility.id, removal, &assigned, &mut summary)
                .await?;
        }
        for assignment in &downloads {
            self.apply_download(facility.id, assignment, source_instance_id, &mut summary)
                .await?;
        }

        tracing::info!(
            facility_id = %facility.id,
            dataset_id = %dataset_id,
            downloads_created = summary.downloads_created,
            removals_created = summary.removals_created,
            requests_deleted = summary.requests_deleted,
            "Synchronized content requests"
        );
        Ok(summary)
    }

    async fn source_instance(
        &self,
        transfer_session_id: Option<TransferSessionId>,
    ) -> AppResult<Option<InstanceId>> {
        let Some(id) = transfer_session_id else {
            return Ok(None);
        };
        let session = self.peers.transfer_session(id).await?;
        if session.is_none() {
            tracing::warn!(transfer_session_id = %id, "Unknown transfer session, no preferred peer");
        }
        Ok(session.map(|s| s.source_instance_id()))
    }

    async fn apply_removal(
        &self,
        facility_id: FacilityId,
        removal: &RemovableAssignment,
        assigned: &HashSet<(String, String, ContentNodeId)>,
        summary: &mut SyncSummary,
    ) -> AppResult<()> {
        let (source_model, source_id) = removal.source();
        let nodes = match removal {
            RemovableAssignment::Removed(a) => vec![a.contentnode_id],
            RemovableAssignment::Deleted { .. } => {
                self.requests
                    .nodes_for_source(RequestKind::Download, source_model, source_id)
                    .await?
            }
        };

        for node in nodes {
            if assigned.contains(&(source_model.to_string(), source_id.to_string(), node)) {
                continue;
            }
            let data = CreateContentRequest {
                kind: RequestKind::Removal,
                facility_id,
                contentnode_id: node,
                source_model: source_model.to_string(),
                source_id: source_id.to_string(),
                reason: RequestReason::SyncInitiated,
                source_instance_id: None,
                metadata: None,
            };
            self.upsert_exclusive(&data, summary).await?;
        }
        Ok(())
    }

    async fn apply_download(
        &self,
        facility_id: FacilityId,
        assignment: &Assignment,
        source_instance_id: Option<InstanceId>,
        summary: &mut SyncSummary,
    ) -> AppResult<()> {
        let data = CreateContentRequest {
            kind: RequestKind::Download,
            facility_id,
            contentnode_id: assignment.contentnode_id,
            source_model: assignment.source_model.clone(),
            source_id: assignment.source_id.clone(),
            reason: RequestReason::SyncInitiated,
            source_instance_id,
            metadata: None,
        };
        self.upsert_exclusive(&data, summary).await?;
        Ok(())
    }

    /// Delete the opposite-kind requests of the same source and node, then
    /// get or create the request.
    pub(crate) async fn upsert_exclusive(
        &self,
        data: &CreateContentRequest,
        summary: &mut SyncSummary,
    ) -> AppResult<ContentRequest> {
        summary.requests_deleted += self
            .requests
            .delete_for_source(
                data.kind.opposite(),
                &data.source_model,
                &data.source_id,
                Some(&[data.contentnode_id]),
                &SUPERSEDED_STATUSES,
            )
            .await?;

        let (request, created) = self.requests.get_or_create(data).await?;
        if created {
            match request.kind {
                RequestKind::Download => summary.downloads_created += 1,
                RequestKind::Removal => summary.removals_created += 1,
            }
            tracing::debug!(
                request_id = %request.id,
                kind = %request.kind.as_str(),
                contentnode_id = %request.contentnode_id,
                source_model = %request.source_model,
                "Created content request"
            );
        }
        Ok(request)
    }
}
