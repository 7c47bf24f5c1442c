//! Network location registry access.

use async_trait::async_trait;

use satchel_core::result::AppResult;
use satchel_core::types::{InstanceId, TransferSessionId};
use satchel_entity::network::{NetworkLocation, TransferSession};

/// Read-only view of known peers and sync history.
#[async_trait]
pub trait PeerRegistry: Send + Sync + std::fmt::Debug + 'static {
    /// Locations registered for an instance, `okay` locations first.
    async fn locations_for_instance(&self, instance_id: InstanceId)
    -> AppResult<Vec<NetworkLocation>>;

    /// Distinct server instance ids of sync sessions, most recently active
    /// first.
    async fn recent_sync_server_instances(&self) -> AppResult<Vec<InstanceId>>;

    /// Look up a transfer session with its parent session's instance ids.
    async fn transfer_session(&self, id: TransferSessionId) -> AppResult<Option<TransferSession>>;

    /// Every registered location, for status reporting.
    async fn list_locations(&self) -> AppResult<Vec<NetworkLocation>>;
}
