//! Partial transfer fragments.

pub mod staging;

pub use staging::{STAGING_DIR, StagingCache};
