//! Network locations known to this device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use satchel_core::types::{InstanceId, LocationId};

/// Last observed reachability of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// The last connection attempt succeeded.
    Okay,
    /// The last connection attempt failed.
    ConnectionFailure,
    /// Never checked.
    Unknown,
}

impl ConnectionStatus {
    /// Sort key placing `Okay` first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Okay => 0,
            Self::Unknown => 1,
            Self::ConnectionFailure => 2,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Okay => "okay",
            Self::ConnectionFailure => "connection_failure",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// How a location entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "location_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    /// Discovered on the local network.
    Dynamic,
    /// Added by an administrator.
    Static,
    /// Built in (e.g., the central content server).
    Reserved,
}

/// A reachable address for a peer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NetworkLocation {
    /// Registry entry identifier.
    pub id: LocationId,
    /// Instance reachable at this location.
    pub instance_id: InstanceId,
    /// Base URL, e.g. `http://192.168.1.10:8080`.
    pub base_url: String,
    /// Whether the peer is on the local network.
    pub is_local: bool,
    /// Last observed reachability.
    pub connection_status: ConnectionStatus,
    /// Software version the peer reported, if any.
    pub kolibri_version: Option<String>,
    /// How the entry was added.
    pub location_type: LocationType,
    /// Whether the peer only carries a subset of a facility's users.
    pub subset_of_users_device: bool,
    /// Last successful contact.
    pub last_accessed: Option<DateTime<Utc>>,
}

impl NetworkLocation {
    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
