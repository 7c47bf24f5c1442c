//! Storage accounting.

pub mod calculator;

pub use calculator::StorageCalculator;
