//! Fetching missing node metadata from peers.
//!
//! Download requests can name nodes this device has never seen. Before a
//! pass can size or import them, their metadata has to come from a peer:
//! first from the peers the requests name, then from any capable peer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use satchel_core::result::AppResult;
use satchel_core::types::{ContentNodeId, InstanceId};
use satchel_network::{PeerClient, VersionFilter};

use crate::context::EngineContext;
use crate::peers::PreferredDevicesWithClient;

/// What one import run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetadataImportSummary {
    /// Nodes that lacked metadata.
    pub requested: usize,
    /// Nodes resolved.
    pub imported: usize,
    /// Nodes still without metadata.
    pub unresolved: usize,
    /// Metadata requests sent to peers.
    pub network_calls: usize,
}

/// Resolves metadata for download requests that lack it.
#[derive(Debug, Clone)]
pub struct MetadataImporter {
    ctx: EngineContext,
    fallback_version: VersionFilter,
}

/// Which nodes a peer is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Only nodes whose requests name the peer.
    Preferred,
    /// Any node still missing.
    Fallback,
}

#[derive(Debug, Default)]
struct ImportRun {
    /// Missing nodes in request order.
    remaining: Vec<ContentNodeId>,
    /// Preferred peers per node.
    preferred: HashMap<ContentNodeId, HashSet<InstanceId>>,
    /// Nodes a peer already said it does not have.
    not_found: HashSet<(InstanceId, ContentNodeId)>,
    summary: MetadataImportSummary,
}

impl ImportRun {
    fn nodes_for(&self, stage: Stage, peer: InstanceId) -> Vec<ContentNodeId> {
        self.remaining
            .iter()
            .copied()
            .filter(|node| !self.not_found.contains(&(peer, *node)))
            .filter(|node| match stage {
                Stage::Preferred => self
                    .preferred
                    .get(node)
                    .is_some_and(|peers| peers.contains(&peer)),
                Stage::Fallback => true,
            })
            .collect()
    }
}

impl MetadataImporter {
    /// Create an importer. Fallback peers must satisfy
    /// `network.fallback_version_requirement`.
    pub fn new(ctx: EngineContext) -> AppResult<Self> {
        let fallback_version = VersionFilter::parse(&ctx.network.fallback_version_requirement)?;
        Ok(Self {
            ctx,
            fallback_version,
        })
    }

    /// Import metadata for every incomplete download that lacks it.
    pub async fn import_missing(&self, cancel: &CancellationToken) -> AppResult<MetadataImportSummary> {
        let missing = self
            .ctx
            .requests
            .incomplete_downloads(&self.ctx.download_query())
            .await?;

        let mut run = ImportRun::default();
        let mut instance_ids = Vec::new();
        for row in missing.iter().filter(|r| !r.has_metadata) {
            let node = row.request.contentnode_id;
            if !run.remaining.contains(&node) {
                run.remaining.push(node);
            }
            if let Some(instance_id) = row.request.source_instance_id {
                run.preferred.entry(node).or_default().insert(instance_id);
                if !instance_ids.contains(&instance_id) {
                    instance_ids.push(instance_id);
                }
            }
        }
        run.summary.requested = run.remaining.len();
        if run.remaining.is_empty() {
            return Ok(run.summary);
        }

        tracing::info!(
            nodes = run.remaining.len(),
            preferred_peers = instance_ids.len(),
            "Importing missing content metadata"
        );

        let selector = self.ctx.peer_selector();
        let preferred = PreferredDevicesWithClient::new(
            selector.preferred(instance_ids.clone(), None),
            Arc::clone(&self.ctx.connector),
        );
        self.visit(preferred.into_stream(), Stage::Preferred, &mut run, cancel)
            .await?;

        if !run.remaining.is_empty() && !cancel.is_cancelled() {
            let fallback = PreferredDevicesWithClient::new(
                selector.preferred(instance_ids, Some(self.fallback_version.clone())),
                Arc::clone(&self.ctx.connector),
            )
            .chain(selector.from_sync_sessions(Some(self.fallback_version.clone())));
            self.visit(fallback.into_stream(), Stage::Fallback, &mut run, cancel)
                .await?;
        }

        run.summary.unresolved = run.remaining.len();
        if run.remaining.is_empty() {
            tracing::info!(
                imported = run.summary.imported,
                network_calls = run.summary.network_calls,
                "Imported all missing content metadata"
            );
        } else {
            tracing::warn!(
                unresolved = run.remaining.len(),
                imported = run.summary.imported,
                "Some content metadata could not be found on any peer"
            );
        }
        Ok(run.summary)
    }

    async fn visit(
        &self,
        mut clients: BoxStream<'static, Arc<dyn PeerClient>>,
        stage: Stage,
        run: &mut ImportRun,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        // Polling the stream connects to the next peer, so check first.
        while !cancel.is_cancelled() && !run.remaining.is_empty() {
            let Some(client) = clients.next().await else {
                break;
            };
            let nodes = run.nodes_for(stage, client.location().instance_id);
            if nodes.is_empty() {
                continue;
            }
            self.fetch_batch(client.as_ref(), nodes, run, cancel).await?;
        }
        Ok(())
    }

    /// Ask one peer for a batch of nodes. Client errors mean the peer lacks
    /// a node; any other failure abandons the rest of the batch.
    async fn fetch_batch(
        &self,
        client: &dyn PeerClient,
        nodes: Vec<ContentNodeId>,
        run: &mut ImportRun,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let peer = client.location().instance_id;
        for node in nodes {
            if cancel.is_cancelled() {
                break;
            }
            if !run.remaining.contains(&node) {
                continue;
            }

            run.summary.network_calls += 1;
            match client.fetch_node_metadata(node).await {
                Ok(Some(doc)) => {
                    self.ctx.content.import_metadata(&doc).await?;
                    let before = run.remaining.len();
                    run.remaining.retain(|n| !doc.contains_node(*n));
                    run.summary.imported += before - run.remaining.len();
                    if !doc.contains_node(node) {
                        run.not_found.insert((peer, node));
                    }
                }
                Ok(None) => {
                    run.not_found.insert((peer, node));
                }
                Err(e) => {
                    tracing::warn!(
                        instance_id = %peer,
                        contentnode_id = %node,
                        error = %e,
                        "Metadata request failed, abandoning peer batch"
                    );
                    break;
                }
            }
        }
        Ok(())
    }
}
