//! Candidate peer locations.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};

use satchel_core::config::DeviceSettings;
use satchel_core::config::network::NetworkConfig;
use satchel_core::types::InstanceId;
use satchel_database::store::PeerRegistry;
use satchel_entity::network::{ConnectionStatus, NetworkLocation};
use satchel_network::VersionFilter;

/// Connection policy applied to every candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPolicy {
    /// The central content source, accepted at any connection status.
    pub central_instance_id: Option<InstanceId>,
    /// Whether peers outside the local network may be used.
    pub allow_non_local: bool,
}

impl PeerPolicy {
    /// Policy for the given device settings and network configuration.
    pub fn new(settings: &DeviceSettings, network: &NetworkConfig) -> Self {
        let central_instance_id = network.central_instance_id.parse().ok();
        if central_instance_id.is_none() {
            tracing::warn!(
                central_instance_id = %network.central_instance_id,
                "Central instance id is not a valid UUID; no peer bypasses health checks"
            );
        }
        Self {
            central_instance_id,
            allow_non_local: settings.allow_download_on_metered_connection
                || !network.metered_connection,
        }
    }

    fn is_central(&self, instance_id: InstanceId) -> bool {
        self.central_instance_id == Some(instance_id)
    }
}

/// Additional location filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationFilter {
    /// Drop devices that only carry a subset of a facility's users.
    NotSubsetOfUsersDevice,
    /// Drop peers outside the local network.
    LocalOnly,
}

impl LocationFilter {
    fn accepts(&self, location: &NetworkLocation) -> bool {
        match self {
            Self::NotSubsetOfUsersDevice => !location.subset_of_users_device,
            Self::LocalOnly => location.is_local,
        }
    }
}

#[derive(Debug, Clone)]
enum InstanceSource {
    Explicit(Vec<InstanceId>),
    SyncSessions,
}

/// Builds [`PreferredDevices`] sharing one registry and policy.
#[derive(Debug, Clone)]
pub struct PeerSelector {
    registry: Arc<dyn PeerRegistry>,
    policy: PeerPolicy,
}

impl PeerSelector {
    /// Create a selector.
    pub fn new(registry: Arc<dyn PeerRegistry>, policy: PeerPolicy) -> Self {
        Self { registry, policy }
    }

    /// Candidates for the given instance ids, in that order.
    pub fn preferred(
        &self,
        instance_ids: Vec<InstanceId>,
        version_filter: Option<VersionFilter>,
    ) -> PreferredDevices {
        PreferredDevices {
            registry: Arc::clone(&self.registry),
            policy: self.policy.clone(),
            source: InstanceSource::Explicit(instance_ids),
            version_filter,
            filters: Vec::new(),
        }
    }

    /// Candidates drawn from recent sync partners, most recent first.
    /// Subset-of-users devices are never used as a content source.
    pub fn from_sync_sessions(&self, version_filter: Option<VersionFilter>) -> PreferredDevices {
        PreferredDevices {
            registry: Arc::clone(&self.registry),
            policy: self.policy.clone(),
            source: InstanceSource::SyncSessions,
            version_filter,
            filters: vec![LocationFilter::NotSubsetOfUsersDevice],
        }
    }
}

/// A lazily evaluated sequence of peer locations, at most one per instance.
///
/// The registry is queried while the stream is consumed, one instance at a
/// time. A consumed stream cannot be restarted; build a new one instead.
#[derive(Debug, Clone)]
pub struct PreferredDevices {
    registry: Arc<dyn PeerRegistry>,
    policy: PeerPolicy,
    source: InstanceSource,
    version_filter: Option<VersionFilter>,
    filters: Vec<LocationFilter>,
}

impl PreferredDevices {
    /// Add a location filter.
    pub fn with_filter(mut self, filter: LocationFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Whether a location passes the policy, the version filter and the
    /// extra filters.
    pub fn accepts(&self, location: &NetworkLocation) -> bool {
        let central = self.policy.is_central(location.instance_id);

        if !central && location.connection_status != ConnectionStatus::Okay {
            return false;
        }
        if !location.is_local && !self.policy.allow_non_local {
            return false;
        }
        if let Some(filter) = &self.version_filter {
            let version_ok = match &location.kolibri_version {
                Some(version) => filter.matches(version),
                None => central,
            };
            if !version_ok {
                return false;
            }
        }
        self.filters.iter().all(|f| f.accepts(location))
    }

    async fn instance_ids(&self) -> Vec<InstanceId> {
        match &self.source {
            InstanceSource::Explicit(ids) => ids.clone(),
            InstanceSource::SyncSessions => {
                match self.registry.recent_sync_server_instances().await {
                    Ok(ids) => ids,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read sync session partners");
                        Vec::new()
                    }
                }
            }
        }
    }

    async fn location_for(&self, instance_id: InstanceId) -> Option<NetworkLocation> {
        let locations = match self.registry.locations_for_instance(instance_id).await {
            Ok(locations) => locations,
            Err(e) => {
                tracing::warn!(instance_id = %instance_id, error = %e, "Failed to read peer locations");
                return None;
            }
        };
        let found = locations.into_iter().find(|l| self.accepts(l));
        if found.is_none() {
            tracing::debug!(instance_id = %instance_id, "No acceptable location for peer");
        }
        found
    }

    /// Consume into a stream of accepted locations.
    pub fn into_stream(self) -> BoxStream<'static, NetworkLocation> {
        stream::once(async move {
            let mut seen = HashSet::new();
            let ids: Vec<InstanceId> = self
                .instance_ids()
                .await
                .into_iter()
                .filter(|id| seen.insert(*id))
                .collect();
            let this = Arc::new(self);
            stream::iter(ids).filter_map(move |id| {
                let this = Arc::clone(&this);
                async move { this.location_for(id).await }
            })
        })
        .flatten()
        .boxed()
    }
}

/// Chain location streams, keeping the first location seen per instance.
pub fn chain_unique(
    streams: Vec<BoxStream<'static, NetworkLocation>>,
) -> BoxStream<'static, NetworkLocation> {
    let mut seen = HashSet::new();
    stream::iter(streams)
        .flatten()
        .filter(move |location| futures::future::ready(seen.insert(location.instance_id)))
        .boxed()
}
