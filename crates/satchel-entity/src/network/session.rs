//! Sync and transfer sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use satchel_core::types::{InstanceId, SyncSessionId, TransferSessionId};

/// A sync session between this device and a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SyncSession {
    /// Session identifier.
    pub id: SyncSessionId,
    /// Instance that initiated the session.
    pub client_instance_id: InstanceId,
    /// Instance that accepted the session.
    pub server_instance_id: InstanceId,
    /// Last time data moved in the session.
    pub last_activity_timestamp: DateTime<Utc>,
}

/// One direction of data movement within a sync session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TransferSession {
    /// Transfer identifier.
    pub id: TransferSessionId,
    /// Parent sync session.
    pub sync_session_id: SyncSessionId,
    /// `true` when the client pushed to the server.
    pub push: bool,
    /// Client side of the parent session.
    pub client_instance_id: InstanceId,
    /// Server side of the parent session.
    pub server_instance_id: InstanceId,
}

impl TransferSession {
    /// The instance that sent the data, and so most likely holds the
    /// content it refers to.
    pub fn source_instance_id(&self) -> InstanceId {
        if self.push {
            self.client_instance_id
        } else {
            self.server_instance_id
        }
    }
}
