use async_trait::async_trait;

use satchel_core::result::AppResult;
use satchel_core::types::{DatasetId, InstanceId, TransferSessionId};
use satchel_entity::assignment::{Assignment, AssignmentScope, RemovableAssignment};
use satchel_entity::device::{DeviceStatus, DeviceStatusRecord};
use satchel_entity::facility::Facility;
use satchel_entity::network::{NetworkLocation, TransferSession};

use super::{AssignmentChange, ChangeKind, MemoryDatabase, now};
use crate::store::{AssignmentSource, DeviceStatusStore, FacilityDirectory, PeerRegistry};

#[async_trait]
impl PeerRegistry for MemoryDatabase {
    async fn locations_for_instance(
        &self,
        instance_id: InstanceId,
    ) -> AppResult<Vec<NetworkLocation>> {
        let state = self.state.read().await;
        let mut locations: Vec<NetworkLocation> = state
            .locations
            .iter()
            .filter(|l| l.instance_id == instance_id)
            .cloned()
            .collect();
        locations.sort_by_key(|l| l.connection_status.rank());
        Ok(locations)
    }

    async fn recent_sync_server_instances(&self) -> AppResult<Vec<InstanceId>> {
        let state = self.state.read().await;
        let mut sessions: Vec<_> = state.sync_sessions.iter().collect();
        sessions.sort_by(|a, b| b.last_activity_timestamp.cmp(&a.last_activity_timestamp));

        let mut instances = Vec::new();
        for session in sessions {
            if !instances.contains(&session.server_instance_id) {
                instances.push(session.server_instance_id);
            }
        }
        Ok(instances)
    }

    async fn transfer_session(&self, id: TransferSessionId) -> AppResult<Option<TransferSession>> {
        let state = self.state.read().await;
        let Some(transfer) = state.transfers.iter().find(|t| t.id == id) else {
            return Ok(None);
        };
        Ok(state
            .sync_sessions
            .iter()
            .find(|s| s.id == transfer.sync_session_id)
            .map(|session| TransferSession {
                id: transfer.id,
                sync_session_id: session.id,
                push: transfer.push,
                client_instance_id: session.client_instance_id,
                server_instance_id: session.server_instance_id,
            }))
    }

    async fn list_locations(&self) -> AppResult<Vec<NetworkLocation>> {
        Ok(self.state.read().await.locations.clone())
    }
}

#[async_trait]
impl FacilityDirectory for MemoryDatabase {
    async fn facility_for_dataset(&self, dataset_id: DatasetId) -> AppResult<Option<Facility>> {
        let state = self.state.read().await;
        Ok(state
            .facilities
            .iter()
            .find(|f| f.dataset_id == dataset_id)
            .cloned())
    }
}

fn in_scope(change: &AssignmentChange, scope: AssignmentScope) -> bool {
    match scope {
        AssignmentScope::TransferSession(id) => change.transfer_session_id == Some(id),
        AssignmentScope::Dataset(id) => change.dataset_id == id,
    }
}

#[async_trait]
impl AssignmentSource for MemoryDatabase {
    fn name(&self) -> &str {
        "memory"
    }

    async fn downloadable(&self, scope: AssignmentScope) -> AppResult<Vec<Assignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|c| in_scope(c, scope))
            .filter_map(|c| match &c.change {
                ChangeKind::Assigned(assignment) => Some(assignment.clone()),
                ChangeKind::Removed(_) => None,
            })
            .collect())
    }

    async fn removable(&self, scope: AssignmentScope) -> AppResult<Vec<RemovableAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|c| in_scope(c, scope))
            .filter_map(|c| match &c.change {
                ChangeKind::Removed(removal) => Some(removal.clone()),
                ChangeKind::Assigned(_) => None,
            })
            .collect())
    }
}

#[async_trait]
impl DeviceStatusStore for MemoryDatabase {
    async fn raise_status(&self, status: DeviceStatus, detail: &str) -> AppResult<()> {
        self.state.write().await.device_status.insert(
            status,
            DeviceStatusRecord {
                status,
                detail: detail.to_string(),
                updated_at: now(),
            },
        );
        Ok(())
    }

    async fn clear_status(&self, status: DeviceStatus) -> AppResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .device_status
            .remove(&status)
            .is_some())
    }

    async fn current_statuses(&self) -> AppResult<Vec<DeviceStatusRecord>> {
        Ok(self
            .state
            .read()
            .await
            .device_status
            .values()
            .cloned()
            .collect())
    }
}
