//! Network location and sync session repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use satchel_core::error::{AppError, ErrorKind};
use satchel_core::result::AppResult;
use satchel_core::types::{InstanceId, TransferSessionId};
use satchel_entity::network::{NetworkLocation, TransferSession};

use crate::store::PeerRegistry;

/// Repository over the peer registry tables.
#[derive(Debug, Clone)]
pub struct NetworkLocationRepository {
    pool: PgPool,
}

impl NetworkLocationRepository {
    /// Create a new network location repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PeerRegistry for NetworkLocationRepository {
    async fn locations_for_instance(
        &self,
        instance_id: InstanceId,
    ) -> AppResult<Vec<NetworkLocation>> {
        sqlx::query_as::<_, NetworkLocation>(
            "SELECT * FROM network_locations WHERE instance_id = $1 \
             ORDER BY CASE connection_status WHEN 'okay' THEN 0 WHEN 'unknown' THEN 1 ELSE 2 END, \
             last_accessed DESC NULLS LAST",
        )
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find locations", e))
    }

    async fn recent_sync_server_instances(&self) -> AppResult<Vec<InstanceId>> {
        sqlx::query_scalar::<_, InstanceId>(
            "SELECT server_instance_id FROM sync_sessions \
             GROUP BY server_instance_id \
             ORDER BY MAX(last_activity_timestamp) DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list sync partners", e)
        })
    }

    async fn transfer_session(&self, id: TransferSessionId) -> AppResult<Option<TransferSession>> {
        sqlx::query_as::<_, TransferSession>(
            "SELECT t.id, t.sync_session_id, t.push, s.client_instance_id, s.server_instance_id \
             FROM transfer_sessions t \
             JOIN sync_sessions s ON s.id = t.sync_session_id \
             WHERE t.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find transfer session", e)
        })
    }

    async fn list_locations(&self) -> AppResult<Vec<NetworkLocation>> {
        sqlx::query_as::<_, NetworkLocation>(
            "SELECT * FROM network_locations ORDER BY last_accessed DESC NULLS LAST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list locations", e))
    }
}
