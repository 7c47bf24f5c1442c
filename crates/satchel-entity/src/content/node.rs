//! Channel and node models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use satchel_core::types::{ChannelId, ContentNodeId};

/// A content channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChannelMetadata {
    /// Channel identifier.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Published version.
    #[serde(default)]
    pub version: i32,
    /// Root node of the channel tree.
    pub root_id: ContentNodeId,
}

/// A node in a channel's content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ContentNode {
    /// Node identifier.
    pub id: ContentNodeId,
    /// Channel the node belongs to.
    pub channel_id: ChannelId,
    /// Parent node; `None` for a channel root.
    pub parent_id: Option<ContentNodeId>,
    /// Display title.
    pub title: String,
    /// Node kind (`topic`, `video`, `exercise`, ...).
    pub kind: String,
    /// Whether all of the node's files are on disk.
    #[serde(default)]
    pub available: bool,
    /// Imported deliberately by an administrator; never removed
    /// automatically.
    #[serde(default)]
    pub admin_imported: bool,
}
