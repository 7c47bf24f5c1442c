//! Device status flags.

use async_trait::async_trait;

use satchel_core::result::AppResult;
use satchel_entity::device::{DeviceStatus, DeviceStatusRecord};

/// Persistence for operator-visible device status flags.
#[async_trait]
pub trait DeviceStatusStore: Send + Sync + std::fmt::Debug + 'static {
    /// Raise a flag, replacing its detail if already raised.
    async fn raise_status(&self, status: DeviceStatus, detail: &str) -> AppResult<()>;

    /// Lower a flag. Returns whether it was raised.
    async fn clear_status(&self, status: DeviceStatus) -> AppResult<bool>;

    /// All raised flags.
    async fn current_statuses(&self) -> AppResult<Vec<DeviceStatusRecord>>;
}
