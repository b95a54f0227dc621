//! Remote chunk client contract and its HTTP implementation.

use crate::error::{Error, Result};
use crate::types::ResourceId;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Payload returned for one chunk request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkPayload {
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Base64-encoded bytes, decoded by the downloader
    Base64(String),
    /// The request succeeded but carried nothing
    Empty,
}

impl ChunkPayload {
    /// Decode into raw bytes; `None` when the payload is empty
    pub fn decode(self) -> Result<Option<Vec<u8>>> {
        let bytes = match self {
            ChunkPayload::Bytes(bytes) => bytes,
            ChunkPayload::Base64(encoded) => {
                base64::engine::general_purpose::STANDARD.decode(encoded.trim())?
            }
            ChunkPayload::Empty => return Ok(None),
        };
        Ok(if bytes.is_empty() { None } else { Some(bytes) })
    }
}

/// Issues byte-range requests against the remote store.
///
/// Implementations must be idempotent: the downloader retries the same
/// `(resource_id, offset, length)` on transient failures.
#[async_trait::async_trait]
pub trait RemoteChunkClient: Send + Sync {
    /// Fetch `length` bytes of `resource_id` starting at `offset`
    async fn request(
        &self,
        resource_id: &ResourceId,
        offset: u64,
        length: u64,
    ) -> Result<ChunkPayload>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkRequestBody<'a> {
    resource_id: &'a str,
    offset: u64,
    length: u64,
}

#[derive(Deserialize)]
struct ChunkResponseBody {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// [`RemoteChunkClient`] that POSTs JSON range requests to a single endpoint.
///
/// The endpoint answers `{"data": "<base64>"}` on success or `{"error": "..."}` when the
/// backend could not serve the range.
pub struct HttpChunkClient {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpChunkClient {
    /// Build a client for `endpoint` with a per-request timeout
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| Error::Config {
            message: format!("invalid chunk endpoint {endpoint}: {e}"),
            key: Some("endpoint".to_string()),
        })?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait::async_trait]
impl RemoteChunkClient for HttpChunkClient {
    async fn request(
        &self,
        resource_id: &ResourceId,
        offset: u64,
        length: u64,
    ) -> Result<ChunkPayload> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ChunkRequestBody {
                resource_id: resource_id.as_str(),
                offset,
                length,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: ChunkResponseBody = response.json().await?;
        if let Some(message) = body.error {
            return Err(Error::Transport(message));
        }

        Ok(match body.data {
            Some(data) if !data.is_empty() => ChunkPayload::Base64(data),
            _ => ChunkPayload::Empty,
        })
    }
}
