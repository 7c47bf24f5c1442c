//! Content tree repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use satchel_core::error::{AppError, ErrorKind};
use satchel_core::result::AppResult;
use satchel_core::types::{ChannelId, ContentNodeId};
use satchel_entity::content::{ContentNode, LocalFile, NodeMetadata};

use crate::store::ContentStore;

/// Repository for channels, nodes and local files.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    /// Create a new content repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl ContentStore for ContentRepository {
    async fn get_node(&self, id: ContentNodeId) -> AppResult<Option<ContentNode>> {
        sqlx::query_as::<_, ContentNode>("SELECT * FROM content_nodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find content node"))
    }

    async fn get_nodes(&self, ids: &[ContentNodeId]) -> AppResult<Vec<ContentNode>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        sqlx::query_as::<_, ContentNode>("SELECT * FROM content_nodes WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load content nodes"))
    }

    async fn files_for_import(&self, id: ContentNodeId) -> AppResult<Vec<LocalFile>> {
        sqlx::query_as::<_, LocalFile>(
            "SELECT lf.* FROM local_files lf \
             WHERE lf.id IN ( \
                SELECT f.local_file_id FROM content_files f WHERE f.contentnode_id = $1 \
                UNION \
                SELECT f.local_file_id FROM content_files f \
                JOIN content_nodes child ON child.parent_id = f.contentnode_id \
                WHERE child.id = $1 AND f.thumbnail \
             ) \
             ORDER BY lf.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list node files"))
    }

    async fn mark_files_available(&self, checksums: &[String]) -> AppResult<()> {
        if checksums.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE local_files SET available = TRUE WHERE id = ANY($1)")
            .bind(checksums)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to mark files available"))?;
        Ok(())
    }

    async fn mark_node_available(&self, id: ContentNodeId) -> AppResult<()> {
        sqlx::query("UPDATE content_nodes SET available = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to mark node available"))?;
        Ok(())
    }

    async fn delete_content(
        &self,
        channel_id: ChannelId,
        node_ids: &[ContentNodeId],
    ) -> AppResult<Vec<LocalFile>> {
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = node_ids.iter().map(|id| id.into_uuid()).collect();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query(
            "UPDATE content_nodes SET available = FALSE \
             WHERE channel_id = $1 AND id = ANY($2)",
        )
        .bind(channel_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to mark nodes unavailable"))?;

        let orphaned = sqlx::query_as::<_, LocalFile>(
            "UPDATE local_files lf SET available = FALSE \
             WHERE lf.available \
             AND lf.id IN ( \
                SELECT f.local_file_id FROM content_files f \
                JOIN content_nodes n ON n.id = f.contentnode_id \
                WHERE n.channel_id = $1 AND n.id = ANY($2) \
             ) \
             AND NOT EXISTS ( \
                SELECT 1 FROM content_files other \
                JOIN content_nodes n2 ON n2.id = other.contentnode_id \
                WHERE other.local_file_id = lf.id AND n2.available \
             ) \
             RETURNING lf.*",
        )
        .bind(channel_id)
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to release local files"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit content deletion"))?;

        Ok(orphaned)
    }

    async fn import_metadata(&self, doc: &NodeMetadata) -> AppResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        for channel in &doc.channels {
            sqlx::query(
                "INSERT INTO content_channels (id, name, version, root_id) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, version = EXCLUDED.version",
            )
            .bind(channel.id)
            .bind(&channel.name)
            .bind(channel.version)
            .bind(channel.root_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to import channel"))?;
        }

        let mut inserted = 0;
        for node in &doc.nodes {
            let result = sqlx::query(
                "INSERT INTO content_nodes (id, channel_id, parent_id, title, kind, available, admin_imported) \
                 VALUES ($1, $2, $3, $4, $5, FALSE, FALSE) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(node.id)
            .bind(node.channel_id)
            .bind(node.parent_id)
            .bind(&node.title)
            .bind(&node.kind)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to import content node"))?;
            inserted += result.rows_affected() as usize;
        }

        for file in &doc.local_files {
            sqlx::query(
                "INSERT INTO local_files (id, extension, file_size, available) \
                 VALUES ($1, $2, $3, FALSE) \
                 ON CONFLICT (id) DO UPDATE SET file_size = COALESCE(local_files.file_size, EXCLUDED.file_size)",
            )
            .bind(&file.id)
            .bind(&file.extension)
            .bind(file.file_size)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to import local file"))?;
        }

        for link in &doc.files {
            sqlx::query(
                "INSERT INTO content_files (id, contentnode_id, local_file_id, thumbnail) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(link.id)
            .bind(link.contentnode_id)
            .bind(&link.local_file_id)
            .bind(link.thumbnail)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to import file link"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit metadata import"))?;

        Ok(inserted)
    }
}
