//! Facility repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use satchel_core::error::{AppError, ErrorKind};
use satchel_core::result::AppResult;
use satchel_core::types::DatasetId;
use satchel_entity::facility::Facility;

use crate::store::FacilityDirectory;

/// Repository for facilities.
#[derive(Debug, Clone)]
pub struct FacilityRepository {
    pool: PgPool,
}

impl FacilityRepository {
    /// Create a new facility repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FacilityDirectory for FacilityRepository {
    async fn facility_for_dataset(&self, dataset_id: DatasetId) -> AppResult<Option<Facility>> {
        sqlx::query_as::<_, Facility>("SELECT * FROM facilities WHERE dataset_id = $1")
            .bind(dataset_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find facility", e))
    }
}
