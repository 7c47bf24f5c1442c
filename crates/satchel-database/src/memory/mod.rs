//! In-memory implementation of every store trait.
//!
//! [`MemoryDatabase`] keeps all tables behind one lock and reproduces the
//! PostgreSQL repositories' semantics, including the size annotations.
//! Tests use it in place of a database.

mod content;
mod peers;
mod requests;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use satchel_core::types::{
    ChannelId, ContentNodeId, DatasetId, FacilityId, SyncSessionId, TransferSessionId,
};
use satchel_entity::assignment::{Assignment, RemovableAssignment};
use satchel_entity::content::{ChannelMetadata, ContentFile, ContentNode, LocalFile};
use satchel_entity::device::{DeviceStatus, DeviceStatusRecord};
use satchel_entity::facility::Facility;
use satchel_entity::network::{NetworkLocation, SyncSession};
use satchel_entity::request::ContentRequest;

/// An assignment change recorded for a dataset, optionally tied to the
/// transfer session that delivered it.
#[derive(Debug, Clone)]
struct AssignmentChange {
    dataset_id: DatasetId,
    transfer_session_id: Option<TransferSessionId>,
    change: ChangeKind,
}

#[derive(Debug, Clone)]
enum ChangeKind {
    Assigned(Assignment),
    Removed(RemovableAssignment),
}

#[derive(Debug, Clone)]
struct TransferRow {
    id: TransferSessionId,
    sync_session_id: SyncSessionId,
    push: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    requests: Vec<ContentRequest>,
    channels: HashMap<ChannelId, ChannelMetadata>,
    nodes: HashMap<ContentNodeId, ContentNode>,
    local_files: HashMap<String, LocalFile>,
    files: Vec<ContentFile>,
    locations: Vec<NetworkLocation>,
    sync_sessions: Vec<SyncSession>,
    transfers: Vec<TransferRow>,
    facilities: Vec<Facility>,
    users_with_roles: HashSet<String>,
    assignments: Vec<AssignmentChange>,
    device_status: HashMap<DeviceStatus, DeviceStatusRecord>,
}

/// All Satchel tables held in memory.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    state: RwLock<MemoryState>,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a channel.
    pub async fn add_channel(&self, channel: ChannelMetadata) {
        self.state.write().await.channels.insert(channel.id, channel);
    }

    /// Insert or replace a node.
    pub async fn add_node(&self, node: ContentNode) {
        self.state.write().await.nodes.insert(node.id, node);
    }

    /// Insert or replace a local file and link it to a node.
    pub async fn add_node_file(&self, node_id: ContentNodeId, file: LocalFile, thumbnail: bool) {
        let mut state = self.state.write().await;
        state.files.push(ContentFile {
            id: uuid::Uuid::new_v4(),
            contentnode_id: node_id,
            local_file_id: file.id.clone(),
            thumbnail,
        });
        state.local_files.insert(file.id.clone(), file);
    }

    /// Register a network location.
    pub async fn add_location(&self, location: NetworkLocation) {
        self.state.write().await.locations.push(location);
    }

    /// Record a sync session.
    pub async fn add_sync_session(&self, session: SyncSession) {
        self.state.write().await.sync_sessions.push(session);
    }

    /// Record a transfer session within an existing sync session.
    pub async fn add_transfer_session(
        &self,
        id: TransferSessionId,
        sync_session_id: SyncSessionId,
        push: bool,
    ) {
        self.state.write().await.transfers.push(TransferRow {
            id,
            sync_session_id,
            push,
        });
    }

    /// Insert a facility.
    pub async fn add_facility(&self, facility: Facility) {
        self.state.write().await.facilities.push(facility);
    }

    /// Give a user a facility role, so their requests are no longer learner
    /// downloads.
    pub async fn add_role(&self, _facility_id: FacilityId, user_id: &str) {
        self.state
            .write()
            .await
            .users_with_roles
            .insert(user_id.to_string());
    }

    /// Record an assignment that needs its content.
    pub async fn add_assignment(
        &self,
        dataset_id: DatasetId,
        transfer_session_id: Option<TransferSessionId>,
        assignment: Assignment,
    ) {
        self.state.write().await.assignments.push(AssignmentChange {
            dataset_id,
            transfer_session_id,
            change: ChangeKind::Assigned(assignment),
        });
    }

    /// Record an assignment change that makes content unnecessary.
    pub async fn add_removal(
        &self,
        dataset_id: DatasetId,
        transfer_session_id: Option<TransferSessionId>,
        removal: RemovableAssignment,
    ) {
        self.state.write().await.assignments.push(AssignmentChange {
            dataset_id,
            transfer_session_id,
            change: ChangeKind::Removed(removal),
        });
    }

    /// Drop every recorded assignment change.
    pub async fn clear_assignments(&self) {
        self.state.write().await.assignments.clear();
    }

    /// Insert a request row as-is, bypassing get-or-create.
    pub async fn insert_request(&self, request: ContentRequest) {
        self.state.write().await.requests.push(request);
    }

    /// Every request row in insertion order.
    pub async fn all_requests(&self) -> Vec<ContentRequest> {
        self.state.read().await.requests.clone()
    }

    /// Current copy of a local file row.
    pub async fn local_file(&self, checksum: &str) -> Option<LocalFile> {
        self.state.read().await.local_files.get(checksum).cloned()
    }
}

impl MemoryState {
    /// The node's files plus its parent's thumbnails, each once.
    fn import_files(&self, node_id: ContentNodeId) -> Vec<&LocalFile> {
        let parent_id = self.nodes.get(&node_id).and_then(|n| n.parent_id);
        let mut seen = HashSet::new();
        self.files
            .iter()
            .filter(|f| {
                f.contentnode_id == node_id
                    || (f.thumbnail && Some(f.contentnode_id) == parent_id)
            })
            .filter(|f| seen.insert(f.local_file_id.clone()))
            .filter_map(|f| self.local_files.get(&f.local_file_id))
            .collect()
    }

    fn total_size(&self, node_id: ContentNodeId, available_files: bool) -> i64 {
        self.import_files(node_id)
            .into_iter()
            .filter(|f| f.available == available_files)
            .map(|f| f.file_size.unwrap_or(0).max(0))
            .sum()
    }

    fn is_learner(&self, request: &ContentRequest) -> bool {
        request.is_user_source() && !self.users_with_roles.contains(&request.source_id)
    }
}

fn oldest_first(rows: &mut [satchel_entity::request::AnnotatedRequest]) {
    rows.sort_by_key(|r| r.request.requested_at);
}

fn now() -> DateTime<Utc> {
    Utc::now()
}
