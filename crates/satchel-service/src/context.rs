//! Dependencies shared by the reconciliation components.

use std::sync::Arc;

use satchel_core::config::{AppConfig, DeviceSettings};
use satchel_core::config::network::NetworkConfig;
use satchel_core::config::reconciliation::ReconciliationConfig;
use satchel_core::traits::storage::StorageProvider;
use satchel_core::result::AppResult;
use satchel_database::PgStores;
use satchel_database::store::{
    ContentRequestStore, ContentStore, DeviceStatusStore, DownloadQuery, PeerRegistry,
};
use satchel_network::{
    HttpPeerConnector, HttpTransferManager, PeerConnector, TransferManager, build_http_client,
};

use crate::peers::{PeerPolicy, PeerSelector};

/// Everything a reconciliation pass reads from and writes to.
///
/// Settings are captured when the context is built. A scheduler that wants
/// to pick up changed settings builds a fresh context per pass.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Content request rows.
    pub requests: Arc<dyn ContentRequestStore>,
    /// Content tree and file availability.
    pub content: Arc<dyn ContentStore>,
    /// Known peers and sync history.
    pub peers: Arc<dyn PeerRegistry>,
    /// Operator-visible status flags.
    pub device_status: Arc<dyn DeviceStatusStore>,
    /// The content directory.
    pub storage: Arc<dyn StorageProvider>,
    /// Imports node resources from peers.
    pub transfers: Arc<dyn TransferManager>,
    /// Opens metadata clients for peers.
    pub connector: Arc<dyn PeerConnector>,
    /// Device content policy.
    pub settings: DeviceSettings,
    /// Peer networking policy.
    pub network: NetworkConfig,
    /// Pass behavior.
    pub reconciliation: ReconciliationConfig,
}

impl EngineContext {
    /// Wire the PostgreSQL stores and HTTP peer clients together.
    pub fn from_stores(
        stores: &PgStores,
        storage: Arc<dyn StorageProvider>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        let http = build_http_client(&config.network)?;
        let content: Arc<dyn ContentStore> = Arc::new(stores.content.clone());
        let transfers = HttpTransferManager::new(
            http.clone(),
            &config.network,
            Arc::clone(&content),
            Arc::clone(&storage),
        );

        Ok(Self {
            requests: Arc::new(stores.requests.clone()),
            content,
            peers: Arc::new(stores.peers.clone()),
            device_status: Arc::new(stores.device_status.clone()),
            storage,
            transfers: Arc::new(transfers),
            connector: Arc::new(HttpPeerConnector::new(http)),
            settings: config.device.clone(),
            network: config.network.clone(),
            reconciliation: config.reconciliation.clone(),
        })
    }

    /// Filters for the incomplete downloads query under the current
    /// settings.
    pub fn download_query(&self) -> DownloadQuery {
        DownloadQuery::for_device(&self.settings)
    }

    /// Peer candidate builder under the current settings.
    pub fn peer_selector(&self) -> PeerSelector {
        PeerSelector::new(
            Arc::clone(&self.peers),
            PeerPolicy::new(&self.settings, &self.network),
        )
    }
}
