//! Metadata import for requests that reference unknown nodes.

pub mod importer;

pub use importer::{MetadataImportSummary, MetadataImporter};
