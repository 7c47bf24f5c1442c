//! Facility lookup and assignment sources.

use async_trait::async_trait;

use satchel_core::result::AppResult;
use satchel_core::types::DatasetId;
use satchel_entity::assignment::{Assignment, AssignmentScope, RemovableAssignment};
use satchel_entity::facility::Facility;

/// Resolves facilities from sync datasets.
#[async_trait]
pub trait FacilityDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// The facility whose data lives in `dataset_id`.
    async fn facility_for_dataset(&self, dataset_id: DatasetId) -> AppResult<Option<Facility>>;
}

/// A model that assigns content (lessons, exams, ...).
///
/// Sources are registered with the assignment bridge; each reports the
/// assignment changes within a scope.
#[async_trait]
pub trait AssignmentSource: Send + Sync + std::fmt::Debug + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Assignments that need their content on this device.
    async fn downloadable(&self, scope: AssignmentScope) -> AppResult<Vec<Assignment>>;

    /// Assignment changes that make content unnecessary.
    async fn removable(&self, scope: AssignmentScope) -> AppResult<Vec<RemovableAssignment>>;
}
