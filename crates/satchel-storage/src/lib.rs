//! # satchel-storage
//!
//! Storage providers for the device's content directory and the staging
//! cache that holds partial transfers.

pub mod chunked;
pub mod providers;

pub use chunked::StagingCache;
pub use providers::{LocalStorageProvider, MemoryStorageProvider};
