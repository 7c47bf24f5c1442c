//! Peer connections and the per-node metadata endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use satchel_core::config::network::NetworkConfig;
use satchel_core::error::AppError;
use satchel_core::types::ContentNodeId;
use satchel_entity::content::NodeMetadata;
use satchel_entity::network::NetworkLocation;

use crate::error::NetworkError;

/// Opens clients for peer locations.
#[async_trait]
pub trait PeerConnector: Send + Sync + std::fmt::Debug + 'static {
    /// Check that the peer answers and return a client bound to it.
    async fn connect(&self, location: &NetworkLocation)
    -> Result<Arc<dyn PeerClient>, NetworkError>;
}

/// A connected peer.
#[async_trait]
pub trait PeerClient: Send + Sync + std::fmt::Debug {
    /// The location this client talks to.
    fn location(&self) -> &NetworkLocation;

    /// Fetch the import document for one node. `Ok(None)` means the peer
    /// answered with a client error, i.e. it does not have the node.
    async fn fetch_node_metadata(
        &self,
        node_id: ContentNodeId,
    ) -> Result<Option<NodeMetadata>, NetworkError>;
}

/// Build the HTTP client shared by peer clients and transfers.
pub fn build_http_client(config: &NetworkConfig) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .build()
        .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))
}

/// Connects to peers over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPeerConnector {
    http: reqwest::Client,
}

impl HttpPeerConnector {
    /// Create a connector using an existing HTTP client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PeerConnector for HttpPeerConnector {
    async fn connect(
        &self,
        location: &NetworkLocation,
    ) -> Result<Arc<dyn PeerClient>, NetworkError> {
        let url = format!("{}/api/public/info/", location.base());
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NetworkError::unreachable(&url, e))?;

        if !response.status().is_success() {
            return Err(NetworkError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        tracing::debug!(
            instance_id = %location.instance_id,
            base_url = %location.base(),
            "Connected to peer"
        );

        Ok(Arc::new(HttpPeerClient {
            http: self.http.clone(),
            location: location.clone(),
        }))
    }
}

/// A peer reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    http: reqwest::Client,
    location: NetworkLocation,
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    fn location(&self) -> &NetworkLocation {
        &self.location
    }

    async fn fetch_node_metadata(
        &self,
        node_id: ContentNodeId,
    ) -> Result<Option<NodeMetadata>, NetworkError> {
        let url = format!(
            "{}/api/public/v2/importmetadata/{}/",
            self.location.base(),
            node_id
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NetworkError::unreachable(&url, e))?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(node_id = %node_id, status = status.as_u16(), "Peer does not have node metadata");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(NetworkError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let doc = response
            .json::<NodeMetadata>()
            .await
            .map_err(|e| NetworkError::decode(&url, e))?;
        Ok(Some(doc))
    }
}
