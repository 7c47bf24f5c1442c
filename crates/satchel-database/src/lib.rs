//! # satchel-database
//!
//! The store traits the reconciliation engine reads and writes through,
//! their PostgreSQL repositories, and an in-memory store with identical
//! semantics.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryDatabase;
pub use repositories::PgStores;
