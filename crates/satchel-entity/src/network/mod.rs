//! Peer registry entities.

pub mod location;
pub mod session;

pub use location::{ConnectionStatus, LocationType, NetworkLocation};
pub use session::{SyncSession, TransferSession};
