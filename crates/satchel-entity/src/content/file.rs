//! File models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use satchel_core::types::ContentNodeId;

/// Directory under the content root that holds imported files.
pub const STORAGE_DIR: &str = "storage";

/// A file on disk, identified by its content checksum. Many nodes may
/// share one local file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct LocalFile {
    /// MD5 checksum in lowercase hex.
    pub id: String,
    /// File extension without the dot.
    pub extension: String,
    /// Size in bytes, when known.
    pub file_size: Option<i64>,
    /// Whether the file is present on disk.
    #[serde(default)]
    pub available: bool,
}

impl LocalFile {
    /// File name within the storage tree, `{checksum}.{extension}`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }

    /// Path relative to the content root:
    /// `storage/{c0}/{c1}/{checksum}.{extension}`.
    pub fn relative_path(&self) -> String {
        let first = self.id.get(0..1).unwrap_or("_");
        let second = self.id.get(1..2).unwrap_or("_");
        format!("{STORAGE_DIR}/{first}/{second}/{}", self.file_name())
    }

    /// Size in bytes, counting an unknown size as zero.
    pub fn size_bytes(&self) -> u64 {
        self.file_size.unwrap_or(0).max(0) as u64
    }
}

/// Link between a node and one of its local files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ContentFile {
    /// Link identifier.
    pub id: Uuid,
    /// Owning node.
    pub contentnode_id: ContentNodeId,
    /// Checksum of the linked local file.
    pub local_file_id: String,
    /// Whether the file is the node's thumbnail.
    #[serde(default)]
    pub thumbnail: bool,
}
