//! Core traits defined in `satchel-core` and implemented by other crates.

pub mod storage;

pub use storage::{ByteStream, StorageCapacity, StorageObjectMeta, StorageProvider};
