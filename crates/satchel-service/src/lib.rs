//! # satchel-service
//!
//! Reconciliation logic for Satchel. The assignment bridge records what the
//! device should hold as content requests; the reconciliation pass works
//! those requests off against peers and local disk space.
//!
//! Components share an [`EngineContext`] built once per pass. Every
//! dependency is an `Arc` trait object so tests can swap in memory stores
//! and fake peers.

pub mod bridge;
pub mod context;
pub mod metadata;
pub mod peers;
pub mod reconcile;
pub mod storage;

pub use bridge::{AssignmentBridge, SyncSummary};
pub use context::EngineContext;
pub use metadata::{MetadataImportSummary, MetadataImporter};
pub use peers::{PeerPolicy, PeerSelector, PreferredDevices, PreferredDevicesWithClient};
pub use reconcile::{
    DownloadExecutor, DownloadResult, PassOutcome, PassSummary, ReconcileError,
    ReconciliationPass, RemovalExecutor,
};
pub use storage::StorageCalculator;
