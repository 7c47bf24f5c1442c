//! Connected peer candidates.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};

use satchel_network::{PeerClient, PeerConnector};

use super::preferred::{PreferredDevices, chain_unique};

/// Wraps one or more [`PreferredDevices`] and connects to each candidate.
///
/// Peers that fail to connect are logged and skipped. When several sources
/// are chained, an instance yielded by an earlier source is not connected
/// to again.
#[derive(Debug, Clone)]
pub struct PreferredDevicesWithClient {
    sources: Vec<PreferredDevices>,
    connector: Arc<dyn PeerConnector>,
}

impl PreferredDevicesWithClient {
    /// Connect to the candidates of `devices`.
    pub fn new(devices: PreferredDevices, connector: Arc<dyn PeerConnector>) -> Self {
        Self {
            sources: vec![devices],
            connector,
        }
    }

    /// Append the candidates of another source.
    pub fn chain(mut self, devices: PreferredDevices) -> Self {
        self.sources.push(devices);
        self
    }

    /// Consume into a stream of connected clients.
    pub fn into_stream(self) -> BoxStream<'static, Arc<dyn PeerClient>> {
        let connector = self.connector;
        let locations = chain_unique(
            self.sources
                .into_iter()
                .map(PreferredDevices::into_stream)
                .collect(),
        );

        locations
            .filter_map(move |location| {
                let connector = Arc::clone(&connector);
                async move {
                    match connector.connect(&location).await {
                        Ok(client) => Some(client),
                        Err(e) => {
                            tracing::warn!(
                                instance_id = %location.instance_id,
                                base_url = %location.base(),
                                error = %e,
                                "Skipping peer that failed to connect"
                            );
                            None
                        }
                    }
                }
            })
            .boxed()
    }
}
