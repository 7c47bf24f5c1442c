//! PostgreSQL implementations of the store traits.

pub mod assignment;
pub mod content;
pub mod content_request;
pub mod device_status;
pub mod facility;
pub mod network_location;

use sqlx::PgPool;

pub use assignment::AssignmentRepository;
pub use content::ContentRepository;
pub use content_request::ContentRequestRepository;
pub use device_status::DeviceStatusRepository;
pub use facility::FacilityRepository;
pub use network_location::NetworkLocationRepository;

/// Every repository over one pool.
#[derive(Debug, Clone)]
pub struct PgStores {
    /// Content requests.
    pub requests: ContentRequestRepository,
    /// Content tree.
    pub content: ContentRepository,
    /// Network locations and sync history.
    pub peers: NetworkLocationRepository,
    /// Facilities.
    pub facilities: FacilityRepository,
    /// Assignment changes.
    pub assignments: AssignmentRepository,
    /// Device status flags.
    pub device_status: DeviceStatusRepository,
}

impl PgStores {
    /// Build every repository from a pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            requests: ContentRequestRepository::new(pool.clone()),
            content: ContentRepository::new(pool.clone()),
            peers: NetworkLocationRepository::new(pool.clone()),
            facilities: FacilityRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            device_status: DeviceStatusRepository::new(pool),
        }
    }
}
