//! Store traits consumed by the service layer.
//!
//! Each trait has a PostgreSQL implementation in
//! [`crate::repositories`] and an in-memory implementation in
//! [`crate::memory`].

pub mod assignment;
pub mod content;
pub mod device;
pub mod peers;
pub mod requests;

pub use assignment::{AssignmentSource, FacilityDirectory};
pub use content::ContentStore;
pub use device::DeviceStatusStore;
pub use peers::PeerRegistry;
pub use requests::{ContentRequestStore, DownloadQuery, RemovalQuery};
