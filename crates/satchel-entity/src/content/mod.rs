//! Content tree entities: channels, nodes, and their files.

pub mod file;
pub mod import;
pub mod node;

pub use file::{ContentFile, LocalFile};
pub use import::NodeMetadata;
pub use node::{ChannelMetadata, ContentNode};
