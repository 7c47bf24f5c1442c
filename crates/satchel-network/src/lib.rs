//! # satchel-network
//!
//! Everything that talks to peers: connecting and fetching node metadata,
//! the version filter applied to peer candidates, and the transfer manager
//! that imports content files over HTTP.

pub mod client;
pub mod error;
pub mod transfer;
pub mod version;

pub use client::{HttpPeerConnector, PeerClient, PeerConnector, build_http_client};
pub use error::{NetworkError, TransferError};
pub use transfer::{HttpTransferManager, ImportJob, ImportOutcome, TransferManager};
pub use version::VersionFilter;
