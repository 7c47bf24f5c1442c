//! Content storage configuration.

use serde::{Deserialize, Serialize};

/// Where imported content files live on this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the content store. Files are laid out under
    /// `storage/{c0}/{c1}/{checksum}.{ext}` and partial transfers under
    /// `_staging/`.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    /// Buffer size in bytes used when streaming transfers to disk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            chunk_size_bytes: default_chunk_size(),
        }
    }
}

fn default_content_dir() -> String {
    "./data/content".to_string()
}

fn default_chunk_size() -> usize {
    65_536
}
