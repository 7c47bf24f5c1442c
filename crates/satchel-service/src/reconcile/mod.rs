//! The reconciliation loop and the executors it drives.

pub mod download;
pub mod outcome;
pub mod pass;
pub mod removal;

pub use download::{DownloadAttempt, DownloadExecutor};
pub use outcome::{DownloadResult, PassOutcome, PassSummary, ReconcileError, RemovalSummary};
pub use pass::{ReconciliationPass, ReliefAction};
pub use removal::RemovalExecutor;
