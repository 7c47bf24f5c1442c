//! Content request repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use satchel_core::error::{AppError, ErrorKind};
use satchel_core::result::AppResult;
use satchel_core::types::{ContentNodeId, RequestId};
use satchel_entity::facility::FACILITY_USER_MODEL;
use satchel_entity::request::{
    AnnotatedRequest, ContentRequest, CreateContentRequest, RequestFilter, RequestKind,
    RequestReason, RequestStatus,
};

use crate::store::{ContentRequestStore, DownloadQuery, RemovalQuery};

/// Repository for content request rows and the annotated request queries.
#[derive(Debug, Clone)]
pub struct ContentRequestRepository {
    pool: PgPool,
}

impl ContentRequestRepository {
    /// Create a new content request repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Wrap `filter` around the annotated request projection. File sizes are
/// summed over local files whose `available` flag equals `available_files`.
fn annotated_query(available_files: bool, filter: &str) -> String {
    format!(
        "SELECT * FROM ( \
            SELECT r.*, \
                EXISTS (SELECT 1 FROM content_nodes n WHERE n.id = r.contentnode_id) AS has_metadata, \
                COALESCE(( \
                    SELECT SUM(GREATEST(COALESCE(lf.file_size, 0), 0)) \
                    FROM local_files lf \
                    WHERE lf.available = {available_files} \
                    AND lf.id IN ( \
                        SELECT f.local_file_id FROM content_files f \
                        WHERE f.contentnode_id = r.contentnode_id \
                        UNION \
                        SELECT f.local_file_id FROM content_files f \
                        JOIN content_nodes child ON child.parent_id = f.contentnode_id \
                        WHERE child.id = r.contentnode_id AND f.thumbnail \
                    ) \
                ), 0)::BIGINT AS total_size, \
                (r.source_model = '{FACILITY_USER_MODEL}' AND NOT EXISTS ( \
                    SELECT 1 FROM facility_roles fr WHERE fr.user_id = r.source_id \
                )) AS is_learner_download \
            FROM content_requests r \
        ) annotated \
        WHERE {filter} \
        ORDER BY requested_at ASC, id ASC"
    )
}

fn status_names(statuses: &[RequestStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn node_uuids(ids: &[ContentNodeId]) -> Vec<Uuid> {
    ids.iter().map(|id| id.into_uuid()).collect()
}

#[async_trait]
impl ContentRequestStore for ContentRequestRepository {
    async fn find_by_id(&self, id: RequestId) -> AppResult<Option<ContentRequest>> {
        sqlx::query_as::<_, ContentRequest>("SELECT * FROM content_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find request", e))
    }

    async fn get_or_create(
        &self,
        data: &CreateContentRequest,
    ) -> AppResult<(ContentRequest, bool)> {
        let row = data.clone().into_request(chrono::Utc::now());

        let inserted = sqlx::query_as::<_, ContentRequest>(
            "INSERT INTO content_requests \
             (id, kind, facility_id, contentnode_id, source_model, source_id, reason, status, \
              requested_at, source_instance_id, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (kind, source_model, source_id, contentnode_id) DO NOTHING \
             RETURNING *",
        )
        .bind(row.id)
        .bind(row.kind)
        .bind(row.facility_id)
        .bind(row.contentnode_id)
        .bind(&row.source_model)
        .bind(&row.source_id)
        .bind(row.reason)
        .bind(row.status)
        .bind(row.requested_at)
        .bind(row.source_instance_id)
        .bind(&row.metadata)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create request", e))?;

        if let Some(created) = inserted {
            return Ok((created, true));
        }

        let existing = sqlx::query_as::<_, ContentRequest>(
            "SELECT * FROM content_requests \
             WHERE kind = $1 AND source_model = $2 AND source_id = $3 AND contentnode_id = $4",
        )
        .bind(data.kind)
        .bind(&data.source_model)
        .bind(&data.source_id)
        .bind(data.contentnode_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load existing request", e)
        })?;

        Ok((existing, false))
    }

    async fn delete_for_source(
        &self,
        kind: RequestKind,
        source_model: &str,
        source_id: &str,
        node_ids: Option<&[ContentNodeId]>,
        statuses: &[RequestStatus],
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM content_requests \
             WHERE kind = $1 AND source_model = $2 AND source_id = $3 \
             AND ($4::uuid[] IS NULL OR contentnode_id = ANY($4)) \
             AND status::text = ANY($5)",
        )
        .bind(kind)
        .bind(source_model)
        .bind(source_id)
        .bind(node_ids.map(node_uuids))
        .bind(status_names(statuses))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete requests", e))?;

        Ok(result.rows_affected())
    }

    async fn nodes_for_source(
        &self,
        kind: RequestKind,
        source_model: &str,
        source_id: &str,
    ) -> AppResult<Vec<ContentNodeId>> {
        sqlx::query_scalar::<_, ContentNodeId>(
            "SELECT DISTINCT contentnode_id FROM content_requests \
             WHERE kind = $1 AND source_model = $2 AND source_id = $3",
        )
        .bind(kind)
        .bind(source_model)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list source nodes", e)
        })
    }

    async fn requests_for_node(&self, node_id: ContentNodeId) -> AppResult<Vec<ContentRequest>> {
        sqlx::query_as::<_, ContentRequest>(
            "SELECT * FROM content_requests WHERE contentnode_id = $1 ORDER BY requested_at ASC",
        )
        .bind(node_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list node requests", e)
        })
    }

    async fn set_status(&self, ids: &[RequestId], status: RequestStatus) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        let result = sqlx::query("UPDATE content_requests SET status = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update request status", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn reset_in_progress(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE content_requests SET status = 'pending' WHERE status = 'in_progress'",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reset stale requests", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn list(&self, filter: &RequestFilter) -> AppResult<Vec<ContentRequest>> {
        sqlx::query_as::<_, ContentRequest>(
            "SELECT * FROM content_requests \
             WHERE ($1::text IS NULL OR kind::text = $1) \
             AND ($2::text IS NULL OR status::text = $2) \
             AND ($3::text IS NULL OR reason::text = $3) \
             AND ($4::uuid IS NULL OR facility_id = $4) \
             ORDER BY requested_at DESC \
             LIMIT $5",
        )
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.reason.map(|r| r.as_str()))
        .bind(filter.facility_id)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list requests", e))
    }

    async fn incomplete_downloads(
        &self,
        query: &DownloadQuery,
    ) -> AppResult<Vec<AnnotatedRequest>> {
        let sql = annotated_query(
            false,
            "kind = 'download' AND status IN ('pending', 'failed') \
             AND NOT ($1 AND is_learner_download) \
             AND NOT ($2 AND reason = 'sync_initiated')",
        );
        sqlx::query_as::<_, AnnotatedRequest>(&sql)
            .bind(query.exclude_learner_downloads)
            .bind(query.exclude_sync_initiated)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to query incomplete downloads", e)
            })
    }

    async fn completed_downloads(
        &self,
        reason: Option<RequestReason>,
    ) -> AppResult<Vec<AnnotatedRequest>> {
        let sql = annotated_query(
            true,
            "kind = 'download' AND status = 'completed' \
             AND ($1::text IS NULL OR reason::text = $1)",
        );
        sqlx::query_as::<_, AnnotatedRequest>(&sql)
            .bind(reason.map(|r| r.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to query completed downloads", e)
            })
    }

    async fn incomplete_removals(&self, query: &RemovalQuery) -> AppResult<Vec<AnnotatedRequest>> {
        let sql = annotated_query(
            true,
            "kind = 'removal' AND status IN ('pending', 'failed') \
             AND ($1::text IS NULL OR reason::text = $1) \
             AND NOT EXISTS ( \
                SELECT 1 FROM content_requests d \
                WHERE d.kind = 'download' AND d.contentnode_id = annotated.contentnode_id \
                AND (d.source_model <> annotated.source_model OR d.source_id <> annotated.source_id) \
             ) \
             AND ($2 OR NOT EXISTS ( \
                SELECT 1 FROM content_nodes n \
                WHERE n.id = annotated.contentnode_id AND n.admin_imported \
             ))",
        );
        sqlx::query_as::<_, AnnotatedRequest>(&sql)
            .bind(query.reason.map(|r| r.as_str()))
            .bind(query.include_protected)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to query incomplete removals", e)
            })
    }
}
