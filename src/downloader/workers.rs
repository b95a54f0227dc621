//! Bounded chunk worker pool — shared FIFO task queue, per-chunk retry, result channel.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::{DownloadError, Error, Result};
use crate::remote::RemoteChunkClient;
use crate::retry::{IsRetryable, download_with_retry};
use crate::types::ResourceId;

use super::chunks::{ChunkResult, ChunkTask};

/// Parameters for running the worker pool over one resource
pub(super) struct ChunkWorkerParams {
    pub(super) client: Arc<dyn RemoteChunkClient>,
    pub(super) resource_id: ResourceId,
    pub(super) tasks: Vec<ChunkTask>,
    pub(super) workers: usize,
    pub(super) retry: RetryConfig,
}

/// Fetch a single chunk, retrying transient failures.
///
/// Empty payloads are turned into [`Error::EmptyResponse`] so they take the same retry path as
/// transport errors. Once the budget is spent the last error is wrapped in
/// [`DownloadError::RetriesExhausted`].
pub(super) async fn fetch_chunk(
    client: &Arc<dyn RemoteChunkClient>,
    resource_id: &ResourceId,
    task: ChunkTask,
    retry: &RetryConfig,
) -> Result<Vec<u8>> {
    let mut attempts = 0u32;

    let result = download_with_retry(retry, || {
        attempts += 1;
        let client = Arc::clone(client);
        let resource_id = resource_id.clone();
        async move {
            let payload = client
                .request(&resource_id, task.offset, task.length)
                .await?;
            payload.decode()?.ok_or_else(|| Error::EmptyResponse {
                resource_id: resource_id.to_string(),
                offset: task.offset,
                length: task.length,
            })
        }
    })
    .await;

    result.map_err(|e| {
        if e.is_retryable() {
            DownloadError::RetriesExhausted {
                index: task.index,
                attempts,
                source: Box::new(e),
            }
            .into()
        } else {
            e
        }
    })
}

/// Run `params.workers` workers until the queue is drained or one of them fails.
///
/// Every completed chunk is handed to `on_result` as soon as it arrives. After the first
/// failure no worker takes a new task; chunks already in flight finish and are delivered,
/// but the call still returns the failure.
pub(super) async fn run_chunk_workers<F>(params: ChunkWorkerParams, mut on_result: F) -> Result<()>
where
    F: FnMut(ChunkResult) -> Result<()>,
{
    let ChunkWorkerParams {
        client,
        resource_id,
        tasks,
        workers,
        retry,
    } = params;

    let worker_count = workers.max(1).min(tasks.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
    let (result_tx, mut result_rx) = mpsc::channel::<ChunkResult>(worker_count.max(1) * 2);
    let cancel_token = CancellationToken::new();
    let retry = Arc::new(retry);

    let mut set = JoinSet::new();
    for worker_id in 0..worker_count {
        let client = Arc::clone(&client);
        let resource_id = resource_id.clone();
        let queue = Arc::clone(&queue);
        let result_tx = result_tx.clone();
        let cancel_token = cancel_token.clone();
        let retry = Arc::clone(&retry);

        set.spawn(async move {
            loop {
                if cancel_token.is_cancelled() {
                    tracing::debug!(worker_id, "Worker stopping after peer failure");
                    return Ok(());
                }

                let Some(task) = queue.lock().await.pop_front() else {
                    return Ok(());
                };

                tracing::debug!(
                    worker_id,
                    resource_id = %resource_id,
                    index = task.index,
                    offset = task.offset,
                    length = task.length,
                    "Fetching chunk"
                );

                let bytes = match fetch_chunk(&client, &resource_id, task, &retry).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        cancel_token.cancel();
                        return Err(e);
                    }
                };

                let result = ChunkResult {
                    index: task.index,
                    bytes,
                };
                if result_tx.send(result).await.is_err() {
                    // Receiver gone: the collector already gave up
                    return Ok(());
                }
            }
        });
    }
    drop(result_tx);

    let mut collect_error = None;
    while let Some(result) = result_rx.recv().await {
        if collect_error.is_some() {
            continue;
        }
        if let Err(e) = on_result(result) {
            cancel_token.cancel();
            collect_error = Some(e);
        }
    }

    let mut worker_error = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                worker_error.get_or_insert(e);
            }
            Err(join_err) => {
                worker_error
                    .get_or_insert(DownloadError::WorkerPanicked(join_err.to_string()).into());
            }
        }
    }

    match worker_error.or(collect_error) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
