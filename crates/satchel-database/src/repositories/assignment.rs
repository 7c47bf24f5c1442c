//! Assignment change repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use satchel_core::error::{AppError, ErrorKind};
use satchel_core::result::AppResult;
use satchel_core::types::ContentNodeId;
use satchel_entity::assignment::{Assignment, AssignmentScope, RemovableAssignment};

use crate::store::AssignmentSource;

/// Reads the assignment changes the sync layer records in
/// `content_assignments`.
#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    /// Create a new assignment repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn changes(
        &self,
        scope: AssignmentScope,
        changes: &[&str],
    ) -> AppResult<Vec<(String, String, Option<ContentNodeId>, String)>> {
        let (column, id): (&str, Uuid) = match scope {
            AssignmentScope::TransferSession(id) => ("transfer_session_id", id.into_uuid()),
            AssignmentScope::Dataset(id) => ("dataset_id", id.into_uuid()),
        };
        let sql = format!(
            "SELECT source_model, source_id, contentnode_id, change::text \
             FROM content_assignments \
             WHERE {column} = $1 AND change::text = ANY($2) \
             ORDER BY created_at ASC"
        );
        let changes: Vec<String> = changes.iter().map(|c| c.to_string()).collect();

        sqlx::query_as::<_, (String, String, Option<ContentNodeId>, String)>(&sql)
            .bind(id)
            .bind(changes)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load assignments", e)
            })
    }
}

#[async_trait]
impl AssignmentSource for AssignmentRepository {
    fn name(&self) -> &str {
        "content_assignments"
    }

    async fn downloadable(&self, scope: AssignmentScope) -> AppResult<Vec<Assignment>> {
        let rows = self.changes(scope, &["assigned"]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(source_model, source_id, node, _)| {
                node.map(|contentnode_id| Assignment {
                    source_model,
                    source_id,
                    contentnode_id,
                })
            })
            .collect())
    }

    async fn removable(&self, scope: AssignmentScope) -> AppResult<Vec<RemovableAssignment>> {
        let rows = self.changes(scope, &["unassigned", "source_deleted"]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(source_model, source_id, node, change)| {
                if change == "source_deleted" {
                    return Some(RemovableAssignment::Deleted {
                        source_model,
                        source_id,
                    });
                }
                node.map(|contentnode_id| {
                    RemovableAssignment::Removed(Assignment {
                        source_model,
                        source_id,
                        contentnode_id,
                    })
                })
            })
            .collect())
    }
}
