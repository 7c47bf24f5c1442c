//! Requests made directly by users.

use satchel_core::result::AppResult;
use satchel_core::types::{ContentNodeId, FacilityId, InstanceId};
use satchel_entity::facility::FACILITY_USER_MODEL;
use satchel_entity::request::{ContentRequest, CreateContentRequest, RequestKind, RequestReason};

use super::service::{AssignmentBridge, SyncSummary};

impl AssignmentBridge {
    /// Ask for a node on behalf of a user. Any removal the user asked for
    /// on the same node is dropped.
    pub async fn request_user_download(
        &self,
        facility_id: FacilityId,
        user_id: &str,
        contentnode_id: ContentNodeId,
        source_instance_id: Option<InstanceId>,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<ContentRequest> {
        let data = CreateContentRequest {
            kind: RequestKind::Download,
            facility_id,
            contentnode_id,
            source_model: FACILITY_USER_MODEL.to_string(),
            source_id: user_id.to_string(),
            reason: RequestReason::UserInitiated,
            source_instance_id,
            metadata,
        };
        self.upsert_exclusive(&data, &mut SyncSummary::default())
            .await
    }

    /// Ask for a node to be removed on behalf of a user. The user's
    /// download request for the node is dropped.
    pub async fn request_user_removal(
        &self,
        facility_id: FacilityId,
        user_id: &str,
        contentnode_id: ContentNodeId,
    ) -> AppResult<ContentRequest> {
        let data = CreateContentRequest {
            kind: RequestKind::Removal,
            facility_id,
            contentnode_id,
            source_model: FACILITY_USER_MODEL.to_string(),
            source_id: user_id.to_string(),
            reason: RequestReason::UserInitiated,
            source_instance_id: None,
            metadata: None,
        };
        self.upsert_exclusive(&data, &mut SyncSummary::default())
            .await
    }
}
