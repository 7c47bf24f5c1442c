//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use satchel_core::config::DeviceSettings;
use satchel_core::config::network::NetworkConfig;
use satchel_core::config::reconciliation::ReconciliationConfig;
use satchel_core::traits::storage::StorageProvider;
use satchel_core::types::{
    ChannelId, ContentNodeId, DatasetId, FacilityId, InstanceId, LocationId, RequestId,
    SyncSessionId,
};
use satchel_database::MemoryDatabase;
use satchel_database::store::{ContentRequestStore, ContentStore};
use satchel_entity::content::{ChannelMetadata, ContentNode, LocalFile, NodeMetadata};
use satchel_entity::facility::{FACILITY_MODEL, FACILITY_USER_MODEL, Facility};
use satchel_entity::network::{ConnectionStatus, LocationType, NetworkLocation, SyncSession};
use satchel_entity::request::{
    ContentRequest, CreateContentRequest, RequestKind, RequestReason, RequestStatus,
};
use satchel_network::{
    ImportJob, ImportOutcome, NetworkError, PeerClient, PeerConnector, TransferError,
    TransferManager,
};
use satchel_service::{AssignmentBridge, EngineContext, ReconciliationPass};
use satchel_storage::MemoryStorageProvider;

/// Test application context over in-memory stores and fake peers
pub struct TestApp {
    /// Every table
    pub db: Arc<MemoryDatabase>,
    /// The content directory
    pub storage: Arc<MemoryStorageProvider>,
    /// Records imports instead of talking to peers
    pub transfers: Arc<FakeTransferManager>,
    /// Serves metadata documents from memory
    pub connector: Arc<FakePeerConnector>,
    /// Device policy used by new contexts
    pub settings: DeviceSettings,
    /// Pass policy used by new contexts
    pub reconciliation: ReconciliationConfig,
    /// The facility requests are made for
    pub facility: Facility,
    /// Channel every helper node lives in
    pub channel_id: ChannelId,
}

impl TestApp {
    /// Create an app whose content directory holds `capacity` bytes.
    pub async fn new(capacity: u64) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let storage = Arc::new(MemoryStorageProvider::with_capacity(capacity));

        let facility = Facility {
            id: FacilityId::new(),
            dataset_id: DatasetId::new(),
            name: "Test Facility".to_string(),
        };
        db.add_facility(facility.clone()).await;

        let channel_id = ChannelId::new();
        db.add_channel(ChannelMetadata {
            id: channel_id,
            name: "Test Channel".to_string(),
            version: 1,
            root_id: ContentNodeId::new(),
        })
        .await;

        Self {
            transfers: Arc::new(FakeTransferManager::new(Arc::clone(&db), Arc::clone(&storage))),
            connector: Arc::new(FakePeerConnector::default()),
            db,
            storage,
            settings: DeviceSettings::default(),
            reconciliation: ReconciliationConfig::default(),
            facility,
            channel_id,
        }
    }

    /// An engine context over this app's stores and fakes.
    pub fn context(&self) -> EngineContext {
        EngineContext {
            requests: self.db.clone(),
            content: self.db.clone(),
            peers: self.db.clone(),
            device_status: self.db.clone(),
            storage: self.storage.clone(),
            transfers: self.transfers.clone(),
            connector: self.connector.clone(),
            settings: self.settings.clone(),
            network: NetworkConfig::default(),
            reconciliation: self.reconciliation.clone(),
        }
    }

    /// A bridge reading assignments from the memory database.
    pub fn bridge(&self) -> AssignmentBridge {
        AssignmentBridge::new(self.db.clone(), self.db.clone(), self.db.clone())
            .with_source(self.db.clone())
    }

    /// A reconciliation pass that does not import metadata.
    pub fn pass(&self) -> ReconciliationPass {
        ReconciliationPass::new(self.context())
            .expect("valid pass configuration")
            .without_metadata_import()
    }

    /// Run one pass without metadata import.
    pub async fn run_pass(&self) -> satchel_service::PassOutcome {
        self.pass()
            .run(&CancellationToken::new())
            .await
            .expect("pass runs")
    }

    /// A node in the test channel with one file of `size` bytes. Available
    /// nodes also get their file written to storage.
    pub async fn add_node(&self, size: Option<i64>, available: bool) -> ContentNodeId {
        let node_id = ContentNodeId::new();
        self.db.add_node(self.node(node_id, None, available)).await;
        let file = local_file(size, available);
        if available {
            self.store_file(&file).await;
        }
        self.db.add_node_file(node_id, file, false).await;
        node_id
    }

    /// A node row without files.
    pub fn node(
        &self,
        id: ContentNodeId,
        parent_id: Option<ContentNodeId>,
        available: bool,
    ) -> ContentNode {
        ContentNode {
            id,
            channel_id: self.channel_id,
            parent_id,
            title: format!("node {}", id.simple()),
            kind: "video".to_string(),
            available,
            admin_imported: false,
        }
    }

    /// Write a file's bytes at its storage path.
    pub async fn store_file(&self, file: &LocalFile) {
        self.storage
            .write(&file.relative_path(), Bytes::from(vec![0u8; file.size_bytes() as usize]))
            .await
            .expect("test storage has room");
    }

    /// Register a local, reachable peer reporting `version`.
    pub async fn add_peer(&self, version: &str) -> NetworkLocation {
        self.add_peer_with_status(version, ConnectionStatus::Okay).await
    }

    /// Register a local peer with the given connection status.
    pub async fn add_peer_with_status(
        &self,
        version: &str,
        connection_status: ConnectionStatus,
    ) -> NetworkLocation {
        let instance_id = InstanceId::new();
        let location = NetworkLocation {
            id: LocationId::new(),
            instance_id,
            base_url: format!("http://{}.local:8080/", instance_id.simple()),
            is_local: true,
            connection_status,
            kolibri_version: Some(version.to_string()),
            location_type: LocationType::Dynamic,
            subset_of_users_device: false,
            last_accessed: Some(Utc::now()),
        };
        self.db.add_location(location.clone()).await;
        location
    }

    /// Record a sync session with `server` as the server side, `age`
    /// minutes ago.
    pub async fn add_sync_partner(&self, server: InstanceId, age_minutes: i64) {
        self.db
            .add_sync_session(SyncSession {
                id: SyncSessionId::new(),
                client_instance_id: InstanceId::new(),
                server_instance_id: server,
                last_activity_timestamp: Utc::now() - Duration::minutes(age_minutes),
            })
            .await;
    }

    /// Create a request directly in the store.
    pub async fn request(
        &self,
        kind: RequestKind,
        reason: RequestReason,
        contentnode_id: ContentNodeId,
        source_instance_id: Option<InstanceId>,
    ) -> ContentRequest {
        let (source_model, source_id) = match reason {
            RequestReason::SyncInitiated => (FACILITY_MODEL, self.facility.id.to_string()),
            RequestReason::UserInitiated => (FACILITY_USER_MODEL, "learner-1".to_string()),
        };
        let data = CreateContentRequest {
            kind,
            facility_id: self.facility.id,
            contentnode_id,
            source_model: source_model.to_string(),
            source_id,
            reason,
            source_instance_id,
            metadata: None,
        };
        let (request, _) = self.db.get_or_create(&data).await.expect("create request");
        request
    }

    /// A sync-initiated download.
    pub async fn request_download(
        &self,
        contentnode_id: ContentNodeId,
        source_instance_id: Option<InstanceId>,
    ) -> ContentRequest {
        self.request(
            RequestKind::Download,
            RequestReason::SyncInitiated,
            contentnode_id,
            source_instance_id,
        )
        .await
    }

    /// A sync-initiated removal.
    pub async fn request_removal(&self, contentnode_id: ContentNodeId) -> ContentRequest {
        self.request(
            RequestKind::Removal,
            RequestReason::SyncInitiated,
            contentnode_id,
            None,
        )
        .await
    }

    /// Current status of a request, `None` once deleted.
    pub async fn status_of(&self, id: RequestId) -> Option<RequestStatus> {
        self.db
            .find_by_id(id)
            .await
            .expect("find request")
            .map(|r| r.status)
    }

    /// Whether the node is marked available.
    pub async fn is_available(&self, id: ContentNodeId) -> bool {
        self.db
            .get_node(id)
            .await
            .expect("get node")
            .is_some_and(|n| n.available)
    }
}

/// A local file with a random checksum.
pub fn local_file(size: Option<i64>, available: bool) -> LocalFile {
    LocalFile {
        id: uuid::Uuid::new_v4().simple().to_string(),
        extension: "mp4".to_string(),
        file_size: size,
        available,
    }
}

/// Imports by writing zeroes for every missing file, unless the peer is
/// marked as lacking the content.
#[derive(Debug)]
pub struct FakeTransferManager {
    db: Arc<MemoryDatabase>,
    storage: Arc<MemoryStorageProvider>,
    missing_on: Mutex<HashSet<InstanceId>>,
    calls: Mutex<Vec<(RequestId, InstanceId)>>,
}

impl FakeTransferManager {
    fn new(db: Arc<MemoryDatabase>, storage: Arc<MemoryStorageProvider>) -> Self {
        Self {
            db,
            storage,
            missing_on: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `instance_id` answer every import with location-not-found.
    pub fn lacks_content(&self, instance_id: InstanceId) {
        self.missing_on.lock().unwrap().insert(instance_id);
    }

    /// Peers asked, in order.
    pub fn peers_called(&self) -> Vec<InstanceId> {
        self.calls.lock().unwrap().iter().map(|(_, i)| *i).collect()
    }

    /// Number of imports attempted.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn import(&self, job: &ImportJob) -> Result<usize, TransferError> {
        let files: Vec<LocalFile> = self
            .db
            .files_for_import(job.contentnode_id)
            .await?
            .into_iter()
            .filter(|f| !f.available)
            .collect();

        let mut checksums = Vec::new();
        for file in &files {
            self.storage
                .write(&file.relative_path(), Bytes::from(vec![0u8; file.size_bytes() as usize]))
                .await?;
            checksums.push(file.id.clone());
        }
        self.db.mark_files_available(&checksums).await?;
        self.db.mark_node_available(job.contentnode_id).await?;
        Ok(1)
    }
}

#[async_trait]
impl TransferManager for FakeTransferManager {
    async fn import_resources(&self, job: &ImportJob, cancel: &CancellationToken) -> ImportOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((job.request_id, job.peer.instance_id));

        if cancel.is_cancelled() {
            return ImportOutcome {
                transferred_count: 0,
                error: Some(TransferError::Cancelled),
            };
        }
        if self.missing_on.lock().unwrap().contains(&job.peer.instance_id) {
            return ImportOutcome {
                transferred_count: 0,
                error: Some(TransferError::LocationNotFound(job.peer.base_url.clone())),
            };
        }

        match self.import(job).await {
            Ok(count) => ImportOutcome {
                transferred_count: count,
                error: None,
            },
            Err(e) => ImportOutcome {
                transferred_count: 0,
                error: Some(e),
            },
        }
    }
}

/// Serves metadata documents registered per peer and counts requests.
#[derive(Debug, Default)]
pub struct FakePeerConnector {
    documents: Arc<Mutex<HashMap<(InstanceId, ContentNodeId), NodeMetadata>>>,
    fetches: Arc<Mutex<Vec<(InstanceId, ContentNodeId)>>>,
    connects: Mutex<Vec<InstanceId>>,
    unreachable: Mutex<HashSet<InstanceId>>,
}

impl FakePeerConnector {
    /// Let `instance_id` answer metadata requests for `node_id` with `doc`.
    pub fn serve(&self, instance_id: InstanceId, node_id: ContentNodeId, doc: NodeMetadata) {
        self.documents
            .lock()
            .unwrap()
            .insert((instance_id, node_id), doc);
    }

    /// Make connections to `instance_id` fail.
    pub fn refuse(&self, instance_id: InstanceId) {
        self.unreachable.lock().unwrap().insert(instance_id);
    }

    /// Metadata requests made, in order.
    pub fn fetches(&self) -> Vec<(InstanceId, ContentNodeId)> {
        self.fetches.lock().unwrap().clone()
    }

    /// Connection attempts made, in order.
    pub fn connects(&self) -> Vec<InstanceId> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerConnector for FakePeerConnector {
    async fn connect(
        &self,
        location: &NetworkLocation,
    ) -> Result<Arc<dyn PeerClient>, NetworkError> {
        self.connects.lock().unwrap().push(location.instance_id);
        if self.unreachable.lock().unwrap().contains(&location.instance_id) {
            return Err(NetworkError::Unreachable {
                url: location.base_url.clone(),
                message: "connection refused".to_string(),
            });
        }
        Ok(Arc::new(FakePeerClient {
            location: location.clone(),
            documents: Arc::clone(&self.documents),
            fetches: Arc::clone(&self.fetches),
        }))
    }
}

#[derive(Debug)]
struct FakePeerClient {
    location: NetworkLocation,
    documents: Arc<Mutex<HashMap<(InstanceId, ContentNodeId), NodeMetadata>>>,
    fetches: Arc<Mutex<Vec<(InstanceId, ContentNodeId)>>>,
}

#[async_trait]
impl PeerClient for FakePeerClient {
    fn location(&self) -> &NetworkLocation {
        &self.location
    }

    async fn fetch_node_metadata(
        &self,
        node_id: ContentNodeId,
    ) -> Result<Option<NodeMetadata>, NetworkError> {
        let key = (self.location.instance_id, node_id);
        self.fetches.lock().unwrap().push(key);
        Ok(self.documents.lock().unwrap().get(&key).cloned())
    }
}

/// A metadata document describing one node with one file of `size` bytes.
pub fn metadata_for(node: ContentNode, size: i64) -> NodeMetadata {
    let file = local_file(Some(size), false);
    NodeMetadata {
        channels: Vec::new(),
        files: vec![satchel_entity::content::ContentFile {
            id: uuid::Uuid::new_v4(),
            contentnode_id: node.id,
            local_file_id: file.id.clone(),
            thumbnail: false,
        }],
        nodes: vec![node],
        local_files: vec![file],
    }
}
