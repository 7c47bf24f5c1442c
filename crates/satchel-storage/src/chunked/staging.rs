//! Staging area for partially downloaded files.
//!
//! A transfer streams into `_staging/{checksum}.{ext}.part` and is renamed
//! into the storage tree once complete. Fragments left behind by failed or
//! interrupted transfers let the next attempt resume, and are the last
//! thing reclaimed when the device runs out of space.

use std::sync::Arc;

use satchel_core::result::AppResult;
use satchel_core::traits::storage::{StorageObjectMeta, StorageProvider};
use satchel_entity::content::LocalFile;

/// Directory under the content root holding fragments.
pub const STAGING_DIR: &str = "_staging";

/// Evictable cache of transfer fragments.
#[derive(Debug, Clone)]
pub struct StagingCache {
    provider: Arc<dyn StorageProvider>,
}

impl StagingCache {
    /// Create a staging cache on top of a storage provider.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Fragment path for a local file.
    pub fn fragment_path(file: &LocalFile) -> String {
        format!("{STAGING_DIR}/{}.part", file.file_name())
    }

    /// Every fragment currently staged.
    pub async fn fragments(&self) -> AppResult<Vec<StorageObjectMeta>> {
        self.provider.list(STAGING_DIR).await
    }

    /// Total bytes held by fragments.
    pub async fn usage(&self) -> AppResult<u64> {
        Ok(self.fragments().await?.iter().map(|f| f.size_bytes).sum())
    }

    /// Delete the fragment for a file, if any.
    pub async fn discard(&self, file: &LocalFile) -> AppResult<()> {
        self.provider.delete(&Self::fragment_path(file)).await
    }

    /// Delete fragments, least recently written first, until at least
    /// `bytes_needed` bytes are freed or nothing is left. Returns the bytes
    /// freed.
    pub async fn evict(&self, bytes_needed: u64) -> AppResult<u64> {
        if bytes_needed == 0 {
            return Ok(0);
        }

        let mut fragments = self.fragments().await?;
        fragments.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut freed = 0u64;
        for fragment in fragments {
            if freed >= bytes_needed {
                break;
            }
            self.provider.delete(&fragment.path).await?;
            freed += fragment.size_bytes;
            tracing::debug!(path = %fragment.path, bytes = fragment.size_bytes, "Evicted staged fragment");
        }

        tracing::info!(bytes_needed, bytes_freed = freed, "Evicted staging cache");
        Ok(freed)
    }
}
