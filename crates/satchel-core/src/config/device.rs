//! Device settings consumed by the reconciliation engine.

use serde::{Deserialize, Serialize};

/// The device-level content policy.
///
/// Passed explicitly into every component that needs it instead of being
/// looked up globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Whether sync-initiated downloads are processed automatically.
    #[serde(default = "default_true")]
    pub enable_automatic_download: bool,
    /// Whether downloads requested by learners (users without roles) are
    /// processed.
    #[serde(default = "default_true")]
    pub allow_learner_download_resources: bool,
    /// Whether non-local peers may be used while on a metered connection.
    #[serde(default)]
    pub allow_download_on_metered_connection: bool,
    /// Whether `limit_for_autodownload` caps the usable disk space.
    #[serde(default)]
    pub set_limit_for_autodownload: bool,
    /// Auto-download quota in bytes.
    #[serde(default)]
    pub limit_for_autodownload: u64,
    /// Whether this device only holds a subset of the facility's users.
    #[serde(default)]
    pub subset_of_users_device: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            enable_automatic_download: true,
            allow_learner_download_resources: true,
            allow_download_on_metered_connection: false,
            set_limit_for_autodownload: false,
            limit_for_autodownload: 0,
            subset_of_users_device: false,
        }
    }
}

fn default_true() -> bool {
    true
}
