//! Peer selection: which peers to ask, in what order.

pub mod client;
pub mod preferred;

pub use client::PreferredDevicesWithClient;
pub use preferred::{LocationFilter, PeerPolicy, PeerSelector, PreferredDevices, chain_unique};
