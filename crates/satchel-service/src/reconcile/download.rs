//! Importing content for download requests.

use std::collections::HashSet;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use satchel_core::result::AppResult;
use satchel_core::types::ChannelId;
use satchel_entity::network::NetworkLocation;
use satchel_entity::request::{ContentRequest, RequestStatus};
use satchel_network::ImportJob;

use super::outcome::{DownloadResult, ReconcileError};
use crate::context::EngineContext;
use crate::peers::chain_unique;

/// What one peer attempt tells the executor to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadAttempt {
    /// The peer delivered the content.
    Succeeded,
    /// Try the next candidate.
    NextPeer,
    /// Stop, the pass is being cancelled.
    Cancelled,
}

/// Imports content for one download request at a time.
#[derive(Debug, Clone)]
pub struct DownloadExecutor {
    ctx: EngineContext,
}

impl DownloadExecutor {
    /// Create an executor.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Process one download request.
    ///
    /// Candidates are the request's preferred peer, then recent sync
    /// partners. The request ends completed, failed when no candidate
    /// delivers, or back at pending when cancelled.
    pub async fn process_download_request(
        &self,
        request: &ContentRequest,
        cancel: &CancellationToken,
    ) -> AppResult<DownloadResult> {
        self.set_status(request, RequestStatus::InProgress).await?;

        let Some(node) = self.ctx.content.get_node(request.contentnode_id).await? else {
            self.set_status(request, RequestStatus::Failed).await?;
            return Ok(DownloadResult::Failed(ReconcileError::MissingMetadata {
                request_id: request.id,
            }));
        };

        if node.available {
            tracing::debug!(request_id = %request.id, contentnode_id = %node.id, "Node already available");
            self.set_status(request, RequestStatus::Completed).await?;
            return Ok(DownloadResult::AlreadyAvailable);
        }

        let selector = self.ctx.peer_selector();
        let mut sources = Vec::new();
        if let Some(instance_id) = request.source_instance_id {
            sources.push(selector.preferred(vec![instance_id], None).into_stream());
        }
        sources.push(selector.from_sync_sessions(None).into_stream());
        let mut candidates = chain_unique(sources);

        let mut tried = HashSet::new();
        while let Some(peer) = candidates.next().await {
            if cancel.is_cancelled() {
                self.set_status(request, RequestStatus::Pending).await?;
                return Ok(DownloadResult::Cancelled);
            }
            if !tried.insert(peer.instance_id) {
                continue;
            }

            match self
                .process_download(request, node.channel_id, &peer, cancel)
                .await
            {
                DownloadAttempt::Succeeded => {
                    self.set_status(request, RequestStatus::Completed).await?;
                    tracing::info!(
                        request_id = %request.id,
                        contentnode_id = %request.contentnode_id,
                        instance_id = %peer.instance_id,
                        "Download completed"
                    );
                    return Ok(DownloadResult::Completed);
                }
                DownloadAttempt::NextPeer => continue,
                DownloadAttempt::Cancelled => {
                    self.set_status(request, RequestStatus::Pending).await?;
                    return Ok(DownloadResult::Cancelled);
                }
            }
        }

        let err = ReconcileError::NoPeerAvailable {
            request_id: request.id,
        };
        tracing::warn!(
            request_id = %request.id,
            contentnode_id = %request.contentnode_id,
            peers_tried = tried.len(),
            "{err}"
        );
        self.set_status(request, RequestStatus::Failed).await?;
        Ok(DownloadResult::Failed(err))
    }

    /// Try one peer. Missing content and empty imports quietly move on;
    /// other errors are logged and move on too.
    pub async fn process_download(
        &self,
        request: &ContentRequest,
        channel_id: ChannelId,
        peer: &NetworkLocation,
        cancel: &CancellationToken,
    ) -> DownloadAttempt {
        let job = ImportJob {
            request_id: request.id,
            contentnode_id: request.contentnode_id,
            channel_id,
            peer: peer.clone(),
        };
        let outcome = self.ctx.transfers.import_resources(&job, cancel).await;

        match outcome.error {
            Some(e) if e.is_cancelled() => DownloadAttempt::Cancelled,
            Some(e) if e.is_location_not_found() => {
                tracing::debug!(request_id = %request.id, instance_id = %peer.instance_id, "Content not on peer");
                DownloadAttempt::NextPeer
            }
            Some(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    instance_id = %peer.instance_id,
                    error = %e,
                    "Import from peer failed"
                );
                DownloadAttempt::NextPeer
            }
            None if outcome.transferred_count == 0 => {
                tracing::debug!(request_id = %request.id, instance_id = %peer.instance_id, "Peer import transferred nothing");
                DownloadAttempt::NextPeer
            }
            None => DownloadAttempt::Succeeded,
        }
    }

    async fn set_status(&self, request: &ContentRequest, status: RequestStatus) -> AppResult<()> {
        self.ctx.requests.set_status(&[request.id], status).await?;
        Ok(())
    }
}
