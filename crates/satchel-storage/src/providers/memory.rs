//! In-memory storage provider with a fixed capacity.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use tokio::sync::RwLock;

use satchel_core::error::{AppError, ErrorKind};
use satchel_core::result::AppResult;
use satchel_core::traits::storage::{
    ByteStream, StorageCapacity, StorageObjectMeta, StorageProvider,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    modified: DateTime<Utc>,
}

/// Storage provider that keeps files in memory.
///
/// The capacity is fixed at construction, so writes fail once it is used up
/// and deletes give space back. That makes disk pressure reproducible.
#[derive(Debug)]
pub struct MemoryStorageProvider {
    total_bytes: u64,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStorageProvider {
    /// Create an empty provider holding at most `total_bytes`.
    pub fn with_capacity(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bytes currently stored.
    pub async fn used_bytes(&self) -> u64 {
        self.objects
            .read()
            .await
            .values()
            .map(|o| o.data.len() as u64)
            .sum()
    }

    /// Store a file with an explicit modification time.
    pub async fn insert_at(&self, path: &str, data: Bytes, modified: DateTime<Utc>) -> AppResult<()> {
        let mut objects = self.objects.write().await;
        self.check_room(&objects, path, data.len() as u64)?;
        objects.insert(normalize(path), StoredObject { data, modified });
        Ok(())
    }

    fn check_room(
        &self,
        objects: &BTreeMap<String, StoredObject>,
        path: &str,
        new_len: u64,
    ) -> AppResult<()> {
        let used: u64 = objects
            .iter()
            .filter(|(p, _)| p.as_str() != normalize(path))
            .map(|(_, o)| o.data.len() as u64)
            .sum();
        if used + new_len > self.total_bytes {
            return Err(AppError::storage(format!(
                "No space left for {path}: {} bytes needed, {} available",
                new_len,
                self.total_bytes.saturating_sub(used)
            )));
        }
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

async fn collect(mut stream: ByteStream) -> AppResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.objects
            .read()
            .await
            .get(&normalize(path))
            .map(|o| o.data.clone())
            .ok_or_else(|| AppError::not_found(format!("File not found: {path}")))
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        self.insert_at(path, data, Utc::now()).await
    }

    async fn write_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64> {
        let data = collect(stream).await?;
        let len = data.len() as u64;
        self.write(path, data).await?;
        Ok(len)
    }

    async fn append_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64> {
        let appended = collect(stream).await?;
        let mut objects = self.objects.write().await;

        let mut data = BytesMut::new();
        if let Some(existing) = objects.get(&normalize(path)) {
            data.extend_from_slice(&existing.data);
        }
        data.extend_from_slice(&appended);

        self.check_room(&objects, path, data.len() as u64)?;
        objects.insert(
            normalize(path),
            StoredObject {
                data: data.freeze(),
                modified: Utc::now(),
            },
        );
        Ok(appended.len() as u64)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.objects.write().await.remove(&normalize(path));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let mut objects = self.objects.write().await;
        let object = objects
            .remove(&normalize(from))
            .ok_or_else(|| AppError::not_found(format!("File not found: {from}")))?;
        objects.insert(normalize(to), object);
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.objects.read().await.contains_key(&normalize(path)))
    }

    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        self.objects
            .read()
            .await
            .get(&normalize(path))
            .map(|o| StorageObjectMeta {
                path: normalize(path),
                size_bytes: o.data.len() as u64,
                last_modified: Some(o.modified),
                is_directory: false,
            })
            .ok_or_else(|| AppError::not_found(format!("Path not found: {path}")))
    }

    async fn list(&self, path: &str) -> AppResult<Vec<StorageObjectMeta>> {
        let prefix = format!("{}/", normalize(path).trim_end_matches('/'));
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .filter(|(p, _)| p.starts_with(&prefix) && !p[prefix.len()..].contains('/'))
            .map(|(p, o)| StorageObjectMeta {
                path: p.clone(),
                size_bytes: o.data.len() as u64,
                last_modified: Some(o.modified),
                is_directory: false,
            })
            .collect())
    }

    async fn capacity(&self) -> AppResult<StorageCapacity> {
        let used = self.used_bytes().await;
        Ok(StorageCapacity {
            total_bytes: self.total_bytes,
            available_bytes: self.total_bytes.saturating_sub(used),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capacity_tracks_writes_and_deletes() {
        let provider = MemoryStorageProvider::with_capacity(1000);
        provider
            .write("storage/a/b/ab.mp4", Bytes::from(vec![0u8; 600]))
            .await
            .unwrap();
        assert_eq!(provider.capacity().await.unwrap().available_bytes, 400);

        provider.delete("storage/a/b/ab.mp4").await.unwrap();
        assert_eq!(provider.capacity().await.unwrap().available_bytes, 1000);
    }

    #[tokio::test]
    async fn test_write_beyond_capacity_fails() {
        let provider = MemoryStorageProvider::with_capacity(10);
        let err = provider
            .write("big.bin", Bytes::from(vec![0u8; 11]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert!(!provider.exists("big.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_is_one_level() {
        let provider = MemoryStorageProvider::with_capacity(100);
        provider.write("_staging/a.part", Bytes::from("a")).await.unwrap();
        provider
            .write("_staging/deeper/b.part", Bytes::from("b"))
            .await
            .unwrap();
        provider.write("storage/c", Bytes::from("c")).await.unwrap();

        let listed = provider.list("_staging").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "_staging/a.part");
    }
}
