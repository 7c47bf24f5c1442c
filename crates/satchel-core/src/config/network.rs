//! Peer networking configuration.

use serde::{Deserialize, Serialize};

/// The central content server's instance id. Locations for this instance are
/// accepted regardless of their connection status.
pub const CENTRAL_CONTENT_INSTANCE_ID: &str = "ca0c9b6e6f2a4b0f8a6d1f7f2e1e9c10";

/// Peer networking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Instance id treated as the central content source.
    #[serde(default = "default_central_instance_id")]
    pub central_instance_id: String,
    /// Whether this device is on a metered connection.
    #[serde(default)]
    pub metered_connection: bool,
    /// Timeout for a single HTTP request to a peer, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Retries for transient (5xx) failures during a file transfer.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between retries, in milliseconds. Doubles per attempt.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    /// Version requirement for peers used as metadata fallbacks.
    #[serde(default = "default_fallback_version")]
    pub fallback_version_requirement: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            central_instance_id: default_central_instance_id(),
            metered_connection: false,
            request_timeout_seconds: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
            fallback_version_requirement: default_fallback_version(),
        }
    }
}

fn default_central_instance_id() -> String {
    CENTRAL_CONTENT_INSTANCE_ID.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    500
}

fn default_fallback_version() -> String {
    ">=0.16.0".to_string()
}
