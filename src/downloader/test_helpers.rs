//! Scripted remote chunk clients for downloader and reader tests.

use crate::error::{Error, Result};
use crate::remote::{ChunkPayload, RemoteChunkClient};
use crate::types::ResourceId;
use base64::Engine;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// How a scripted request at a given offset misbehaves before serving data
#[derive(Clone, Copy, Debug)]
pub(crate) enum Fault {
    /// Transport error
    Transport,
    /// Success without payload
    Empty,
}

/// Serves ranges of an in-memory blob, with per-offset faults and delays.
pub(crate) struct ScriptedClient {
    data: Vec<u8>,
    faults: Mutex<HashMap<u64, (Fault, u32)>>,
    delays: HashMap<u64, Duration>,
    base64: bool,
    calls: AtomicU32,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl ScriptedClient {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            faults: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            base64: false,
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail the request at `offset` `times` times before succeeding
    pub(crate) fn failing_at(self, offset: u64, fault: Fault, times: u32) -> Self {
        self.faults.lock().unwrap().insert(offset, (fault, times));
        self
    }

    /// Delay the response for `offset`
    pub(crate) fn delayed_at(mut self, offset: u64, delay: Duration) -> Self {
        self.delays.insert(offset, delay);
        self
    }

    /// Answer with base64 payloads instead of raw bytes
    pub(crate) fn base64(mut self) -> Self {
        self.base64 = true;
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<(u64, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RemoteChunkClient for ScriptedClient {
    async fn request(
        &self,
        _resource_id: &ResourceId,
        offset: u64,
        length: u64,
    ) -> Result<ChunkPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((offset, length));

        if let Some(delay) = self.delays.get(&offset) {
            tokio::time::sleep(*delay).await;
        }

        let fault = {
            let mut faults = self.faults.lock().unwrap();
            match faults.get_mut(&offset) {
                Some((fault, remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(*fault)
                }
                _ => None,
            }
        };
        match fault {
            Some(Fault::Transport) => return Err(Error::Transport("connection reset".into())),
            Some(Fault::Empty) => return Ok(ChunkPayload::Empty),
            None => {}
        }

        let start = (offset as usize).min(self.data.len());
        let end = (offset + length).min(self.data.len() as u64) as usize;
        let bytes = self.data[start..end].to_vec();

        Ok(if self.base64 {
            ChunkPayload::Base64(base64::engine::general_purpose::STANDARD.encode(bytes))
        } else {
            ChunkPayload::Bytes(bytes)
        })
    }
}
