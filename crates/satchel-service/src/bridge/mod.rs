//! The assignment bridge: the only writer of new content requests.

pub mod service;
pub mod user;

pub use service::{AssignmentBridge, SyncSummary};
