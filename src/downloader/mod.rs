//! Remote acquisition: dispatch by file name, then chunked, retrying download.
//!
//! Split into focused submodules:
//! - [`chunks`] - Chunk planning and index-addressed reassembly
//! - [`workers`] - Bounded worker pool with per-chunk retry

mod chunks;
mod workers;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use chunks::{ChunkAssembler, ChunkResult, ChunkTask, plan_chunks};

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::config::Config;
use crate::error::{DownloadError, Error, Result};
use crate::format::{SourceKind, classify_source_name};
use crate::remote::RemoteChunkClient;
use crate::types::{Event, EventSender, RemoteResource};

use workers::{ChunkWorkerParams, fetch_chunk, run_chunk_workers};

/// What a download produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Acquisition {
    /// Decoded plain text (fetched with a single request)
    Text(String),
    /// The resource belongs to an external viewer; nothing was downloaded
    External,
    /// The reassembled bytes of an archive
    Buffer(Vec<u8>),
}

/// Downloads remote resources through a [`RemoteChunkClient`] (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ChunkDownloader {
    client: Arc<dyn RemoteChunkClient>,
    config: Arc<Config>,
    event_tx: EventSender,
}

impl ChunkDownloader {
    /// Create a downloader publishing progress on `event_tx`
    pub fn new(
        client: Arc<dyn RemoteChunkClient>,
        config: Arc<Config>,
        event_tx: EventSender,
    ) -> Self {
        Self {
            client,
            config,
            event_tx,
        }
    }

    /// Acquire `resource`, reporting chunk progress (0-100) through `on_progress`.
    ///
    /// Text resources are fetched with one request and decoded, external-viewer resources
    /// return [`Acquisition::External`] without any request, and everything else is fetched
    /// as a byte buffer. Terminal failures come back as [`Error::Acquisition`] naming the
    /// resource and the last percentage reached.
    pub async fn download<P>(
        &self,
        resource: &RemoteResource,
        mut on_progress: P,
    ) -> Result<Acquisition>
    where
        P: FnMut(u8) + Send,
    {
        let kind = classify_source_name(resource.source_name.as_deref(), &self.config.download);
        let last_percent = AtomicU8::new(0);

        let outcome = match kind {
            SourceKind::External => {
                tracing::info!(resource_id = %resource.id, "Resource handled by external viewer");
                return Ok(Acquisition::External);
            }
            SourceKind::Text => self.fetch_text(resource).await.map(|text| {
                on_progress(100);
                Acquisition::Text(text)
            }),
            SourceKind::Archive => self
                .fetch_buffer(resource, on_progress, &last_percent)
                .await
                .map(Acquisition::Buffer),
        };

        outcome.map_err(|e| {
            let percent = last_percent.load(Ordering::Relaxed);
            tracing::error!(resource_id = %resource.id, percent, error = %e, "Download failed");
            self.event_tx
                .send(Event::DownloadFailed {
                    resource_id: resource.id.clone(),
                    error: e.to_string(),
                    percent,
                })
                .ok();
            Error::Acquisition {
                resource_id: resource.id.to_string(),
                percent,
                source: Box::new(e),
            }
        })
    }

    /// Single fetch of at most `text_fetch_limit` bytes, decoded as UTF-8
    async fn fetch_text(&self, resource: &RemoteResource) -> Result<String> {
        if resource.size == Some(0) {
            return Ok(String::new());
        }
        let limit = self.config.download.text_fetch_limit;
        let length = resource.known_size().map_or(limit, |size| size.min(limit));

        let task = ChunkTask {
            index: 0,
            offset: 0,
            length,
        };
        let bytes = fetch_chunk(&self.client, &resource.id, task, &self.config.retry).await?;
        tracing::info!(resource_id = %resource.id, bytes = bytes.len(), "Fetched text resource");

        Ok(decode_text(&bytes))
    }

    async fn fetch_buffer<P>(
        &self,
        resource: &RemoteResource,
        mut on_progress: P,
        last_percent: &AtomicU8,
    ) -> Result<Vec<u8>>
    where
        P: FnMut(u8) + Send,
    {
        let download = &self.config.download;
        let size = resource
            .known_size()
            .ok_or_else(|| DownloadError::SizeUnknown {
                resource_id: resource.id.to_string(),
            })?;

        let tasks = if size < download.single_request_threshold {
            vec![ChunkTask {
                index: 0,
                offset: 0,
                length: size,
            }]
        } else {
            plan_chunks(size, download.chunk_size)?
        };

        let total = tasks.len();
        tracing::info!(
            resource_id = %resource.id,
            size,
            chunks = total,
            workers = download.workers,
            "Starting chunked download"
        );

        let mut assembler = ChunkAssembler::new(total);
        let params = ChunkWorkerParams {
            client: Arc::clone(&self.client),
            resource_id: resource.id.clone(),
            tasks,
            workers: download.workers,
            retry: self.config.retry.clone(),
        };

        run_chunk_workers(params, |result| {
            assembler.insert(result)?;
            let completed = assembler.completed();
            let percent = chunks::percent(completed, total);
            last_percent.store(percent, Ordering::Relaxed);
            on_progress(percent);
            self.event_tx
                .send(Event::DownloadProgress {
                    resource_id: resource.id.clone(),
                    completed,
                    total,
                    percent,
                })
                .ok();
            Ok(())
        })
        .await?;

        let buffer = assembler.finish(Some(size))?;
        tracing::info!(resource_id = %resource.id, bytes = buffer.len(), "Download complete");
        self.event_tx
            .send(Event::DownloadComplete {
                resource_id: resource.id.clone(),
                bytes: buffer.len() as u64,
            })
            .ok();

        Ok(buffer)
    }
}

/// Decode fetched text as UTF-8, replacing invalid sequences and dropping a leading BOM
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
