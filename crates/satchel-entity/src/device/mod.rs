//! Device-level status flags surfaced to operators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// A status the device can be flagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "device_status_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Pending downloads cannot fit even after every relief action.
    InsufficientStorage,
}

impl DeviceStatus {
    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientStorage => "insufficient_storage",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A currently raised status flag.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceStatusRecord {
    /// Which flag.
    pub status: DeviceStatus,
    /// Human-readable detail.
    pub detail: String,
    /// When the flag was last raised.
    pub updated_at: DateTime<Utc>,
}
