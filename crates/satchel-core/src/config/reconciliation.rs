//! Reconciliation pass policy.

use serde::{Deserialize, Serialize};

/// Tunables for a single reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// When true, downloads that failed earlier in a pass become eligible
    /// again after a relief action frees space. When false they wait for the
    /// next scheduled pass.
    #[serde(default)]
    pub retry_failed_within_pass: bool,
}
