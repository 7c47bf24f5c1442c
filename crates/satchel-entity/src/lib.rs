//! # satchel-entity
//!
//! Domain entity models for Satchel. Every struct in this crate represents
//! a database row or a domain value object. All entities derive `Debug`,
//! `Clone`, `Serialize`, `Deserialize`, and database entities additionally
//! derive `sqlx::FromRow`.

pub mod assignment;
pub mod content;
pub mod device;
pub mod facility;
pub mod network;
pub mod request;
