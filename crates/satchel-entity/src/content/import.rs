//! The partial import document served by a peer's metadata endpoint.

use serde::{Deserialize, Serialize};

use super::file::{ContentFile, LocalFile};
use super::node::{ChannelMetadata, ContentNode};
use satchel_core::types::ContentNodeId;

/// Rows a peer returns for one node: the node, its ancestors, its files
/// and its channel. Keys follow the peer's table names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Channel rows.
    #[serde(rename = "content_channelmetadata", default)]
    pub channels: Vec<ChannelMetadata>,
    /// Node rows, ancestors included.
    #[serde(rename = "content_contentnode", default)]
    pub nodes: Vec<ContentNode>,
    /// Local file rows.
    #[serde(rename = "content_localfile", default)]
    pub local_files: Vec<LocalFile>,
    /// Node to file links.
    #[serde(rename = "content_file", default)]
    pub files: Vec<ContentFile>,
}

impl NodeMetadata {
    /// Whether the document contains the given node.
    pub fn contains_node(&self, id: ContentNodeId) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    /// Whether the document carries nothing at all.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
            && self.nodes.is_empty()
            && self.local_files.is_empty()
            && self.files.is_empty()
    }
}
