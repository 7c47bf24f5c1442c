//! # satchel-core
//!
//! Core crate for Satchel. Contains configuration schemas, typed
//! identifiers, byte-size helpers, the storage provider trait, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Satchel crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
