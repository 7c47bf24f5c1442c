//! Facilities and the source model names used by requests.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use satchel_core::types::{DatasetId, FacilityId};

/// Source model of requests made on behalf of a whole facility.
pub const FACILITY_MODEL: &str = "kolibriauth.facility";

/// Source model of requests made by an individual user.
pub const FACILITY_USER_MODEL: &str = "kolibriauth.facilityuser";

/// A facility known to this device.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Facility {
    /// Facility identifier.
    pub id: FacilityId,
    /// Sync dataset the facility's data belongs to.
    pub dataset_id: DatasetId,
    /// Display name.
    pub name: String,
}
