//! Importing a node's files from a peer.
//!
//! Each missing file is streamed into a staging fragment, verified against
//! the size recorded in the content store and renamed into the storage
//! tree. Fragments survive network failures so the next attempt resumes
//! with a `Range` request; they are deleted on cancellation and on
//! corruption.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use satchel_core::config::network::NetworkConfig;
use satchel_core::traits::storage::{ByteStream, StorageProvider};
use satchel_core::types::{ChannelId, ContentNodeId, RequestId};
use satchel_database::store::ContentStore;
use satchel_entity::content::LocalFile;
use satchel_entity::network::NetworkLocation;
use satchel_storage::StagingCache;

use crate::error::{NetworkError, TransferError};

/// One node to import from one peer.
#[derive(Debug, Clone)]
pub struct ImportJob {
    /// Request being served.
    pub request_id: RequestId,
    /// Node to import.
    pub contentnode_id: ContentNodeId,
    /// Channel of the node.
    pub channel_id: ChannelId,
    /// Peer to import from.
    pub peer: NetworkLocation,
}

/// Result of an import attempt.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    /// Nodes made available by this import.
    pub transferred_count: usize,
    /// Why the import stopped early, if it did.
    pub error: Option<TransferError>,
}

impl ImportOutcome {
    fn completed(count: usize) -> Self {
        Self {
            transferred_count: count,
            error: None,
        }
    }

    fn failed(error: TransferError) -> Self {
        Self {
            transferred_count: 0,
            error: Some(error),
        }
    }
}

/// Moves content from a peer onto this device.
#[async_trait]
pub trait TransferManager: Send + Sync + std::fmt::Debug + 'static {
    /// Import the resources of `job.contentnode_id` from `job.peer`.
    async fn import_resources(&self, job: &ImportJob, cancel: &CancellationToken)
    -> ImportOutcome;
}

/// [`TransferManager`] fetching files from a peer's content endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransferManager {
    http: reqwest::Client,
    content: Arc<dyn ContentStore>,
    storage: Arc<dyn StorageProvider>,
    staging: StagingCache,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpTransferManager {
    /// Create a transfer manager writing into `storage`.
    pub fn new(
        http: reqwest::Client,
        config: &NetworkConfig,
        content: Arc<dyn ContentStore>,
        storage: Arc<dyn StorageProvider>,
    ) -> Self {
        Self {
            http,
            content,
            staging: StagingCache::new(Arc::clone(&storage)),
            storage,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    async fn import(&self, job: &ImportJob, cancel: &CancellationToken) -> Result<usize, TransferError> {
        let files = self.content.files_for_import(job.contentnode_id).await?;
        let missing: Vec<LocalFile> = files.into_iter().filter(|f| !f.available).collect();

        for file in &missing {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            self.transfer_file(&job.peer, file, cancel).await?;
        }

        let checksums: Vec<String> = missing.iter().map(|f| f.id.clone()).collect();
        self.content.mark_files_available(&checksums).await?;
        self.content.mark_node_available(job.contentnode_id).await?;

        tracing::info!(
            request_id = %job.request_id,
            contentnode_id = %job.contentnode_id,
            channel_id = %job.channel_id,
            files = missing.len(),
            "Imported node resources"
        );
        Ok(1)
    }

    async fn transfer_file(
        &self,
        peer: &NetworkLocation,
        file: &LocalFile,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let url = format!("{}/content/{}", peer.base(), file.relative_path());
        let fragment = StagingCache::fragment_path(file);
        let expected = file.file_size.map(|size| size.max(0) as u64);

        let mut resume_from = if self.storage.exists(&fragment).await? {
            self.storage.metadata(&fragment).await?.size_bytes
        } else {
            0
        };

        if expected.is_some_and(|size| size > 0 && resume_from >= size) {
            tracing::debug!(file = %file.file_name(), "Fragment already complete");
        } else {
            let mut response = self.send_with_retry(&url, resume_from, cancel).await?;
            if resume_from > 0 && response.status() == reqwest::StatusCode::RANGE_NOT_SATISFIABLE {
                tracing::debug!(
                    file = %file.file_name(),
                    resumed_from = resume_from,
                    "Peer rejected resume range, refetching whole file"
                );
                self.staging.discard(file).await?;
                resume_from = 0;
                response = self.send_with_retry(&url, 0, cancel).await?;
            }
            let status = response.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(TransferError::LocationNotFound(url));
            }
            if !status.is_success() {
                return Err(NetworkError::Status {
                    url,
                    status: status.as_u16(),
                }
                .into());
            }

            let append = resume_from > 0 && status == reqwest::StatusCode::PARTIAL_CONTENT;
            if !append {
                resume_from = 0;
            }

            let token = cancel.clone();
            let stream: ByteStream = Box::pin(response.bytes_stream().map(move |chunk| {
                if token.is_cancelled() {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "transfer cancelled"));
                }
                chunk.map_err(io::Error::other)
            }));

            let written = if append {
                self.storage.append_stream(&fragment, stream).await
            } else {
                self.storage.write_stream(&fragment, stream).await
            };

            if cancel.is_cancelled() {
                self.staging.discard(file).await?;
                return Err(TransferError::Cancelled);
            }
            let written = written?;

            tracing::debug!(
                file = %file.file_name(),
                resumed_from = resume_from,
                bytes = written,
                "Fetched file from peer"
            );
        }

        let actual = self.storage.metadata(&fragment).await?.size_bytes;
        if let Some(expected) = expected {
            if actual != expected {
                self.staging.discard(file).await?;
                return Err(TransferError::Corrupt {
                    file: file.file_name(),
                    expected,
                    actual,
                });
            }
        }

        self.storage.rename(&fragment, &file.relative_path()).await?;
        Ok(())
    }

    async fn send_with_retry(
        &self,
        url: &str,
        resume_from: u64,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, TransferError> {
        let mut attempt = 0u32;
        loop {
            let mut request = self.http.get(url);
            if resume_from > 0 {
                request = request.header(reqwest::header::RANGE, format!("bytes={resume_from}-"));
            }

            let retryable = match request.send().await {
                Ok(response) if response.status().is_server_error() => {
                    if attempt >= self.max_retries {
                        return Ok(response);
                    }
                    format!("HTTP {}", response.status().as_u16())
                }
                Ok(response) => return Ok(response),
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(NetworkError::unreachable(url, err).into());
                    }
                    err.to_string()
                }
            };

            let delay = self.retry_backoff.saturating_mul(1 << attempt.min(16));
            tracing::warn!(url, attempt, error = %retryable, ?delay, "Transfer request failed, retrying");
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

#[async_trait]
impl TransferManager for HttpTransferManager {
    async fn import_resources(
        &self,
        job: &ImportJob,
        cancel: &CancellationToken,
    ) -> ImportOutcome {
        match self.import(job, cancel).await {
            Ok(count) => ImportOutcome::completed(count),
            Err(error) => {
                tracing::debug!(
                    request_id = %job.request_id,
                    peer = %job.peer.base(),
                    error = %error,
                    "Import from peer stopped"
                );
                ImportOutcome::failed(error)
            }
        }
    }
}
