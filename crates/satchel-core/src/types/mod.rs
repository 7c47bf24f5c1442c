//! Core type definitions used across the Satchel workspace.

pub mod id;
pub mod size;

pub use id::*;
pub use size::human_size;
