//! Device status repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use satchel_core::error::{AppError, ErrorKind};
use satchel_core::result::AppResult;
use satchel_entity::device::{DeviceStatus, DeviceStatusRecord};

use crate::store::DeviceStatusStore;

/// Repository for device status flags.
#[derive(Debug, Clone)]
pub struct DeviceStatusRepository {
    pool: PgPool,
}

impl DeviceStatusRepository {
    /// Create a new device status repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStatusStore for DeviceStatusRepository {
    async fn raise_status(&self, status: DeviceStatus, detail: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO device_status (status, detail, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (status) DO UPDATE SET detail = EXCLUDED.detail, updated_at = NOW()",
        )
        .bind(status)
        .bind(detail)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set device status", e))?;
        Ok(())
    }

    async fn clear_status(&self, status: DeviceStatus) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM device_status WHERE status = $1")
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clear device status", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn current_statuses(&self) -> AppResult<Vec<DeviceStatusRecord>> {
        sqlx::query_as::<_, DeviceStatusRecord>(
            "SELECT * FROM device_status ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load device status", e))
    }
}
