//! In-process storage network.
//!
//! Returns exactly what it was given. Identifiers are `m` followed by the hex
//! MD5 of the stored bytes, so equal payloads share an identifier. Objects are
//! kept as the chunk sequence `cat` will replay, which lets callers control
//! delivery order and inject mid-stream failures. Call counters make it
//! usable as a test double; `--memory-network` runs the service against it
//! without a gateway.

use crate::services::{
    connection::ConnectionParams,
    network::{ChunkStream, NetworkConnector, NetworkError, NetworkResult, StorageNetwork},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Clone, Debug)]
struct StoredObject {
    chunks: Vec<Bytes>,
    /// Fail the stream after replaying `chunks`.
    truncated: bool,
}

#[derive(Debug)]
pub struct MemoryNetwork {
    objects: Mutex<HashMap<String, StoredObject>>,
    chunk_size: usize,
    add_calls: AtomicUsize,
    cat_calls: AtomicUsize,
    failing_adds: Mutex<Vec<usize>>,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// `cat` will replay stored objects in chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            chunk_size: chunk_size.max(1),
            add_calls: AtomicUsize::new(0),
            cat_calls: AtomicUsize::new(0),
            failing_adds: Mutex::new(Vec::new()),
        }
    }

    /// Make the `n`-th call to `add` (1-based, counted over the network's
    /// lifetime) fail with [`NetworkError::Unavailable`].
    pub fn fail_add_call(&self, n: usize) {
        lock(&self.failing_adds).push(n);
    }

    /// Store an object under `cid` as exactly these chunks.
    pub fn insert_chunks(&self, cid: impl Into<String>, chunks: Vec<Bytes>) {
        lock(&self.objects).insert(
            cid.into(),
            StoredObject {
                chunks,
                truncated: false,
            },
        );
    }

    /// Store an object whose stream errors after yielding `chunks`.
    pub fn insert_truncated(&self, cid: impl Into<String>, chunks: Vec<Bytes>) {
        lock(&self.objects).insert(
            cid.into(),
            StoredObject {
                chunks,
                truncated: true,
            },
        );
    }

    /// Reassembled bytes stored under `cid`.
    pub fn get(&self, cid: &str) -> Option<Bytes> {
        lock(&self.objects).get(cid).map(|obj| {
            let mut buf = Vec::new();
            for chunk in &obj.chunks {
                buf.extend_from_slice(chunk);
            }
            Bytes::from(buf)
        })
    }

    pub fn contains(&self, cid: &str) -> bool {
        lock(&self.objects).contains_key(cid)
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn cat_calls(&self) -> usize {
        self.cat_calls.load(Ordering::SeqCst)
    }

    /// Total network interactions of either kind.
    pub fn calls(&self) -> usize {
        self.add_calls() + self.cat_calls()
    }

    fn content_id(bytes: &[u8]) -> String {
        format!("m{:x}", md5::compute(bytes))
    }

    fn split(&self, bytes: &Bytes) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let end = (offset + self.chunk_size).min(bytes.len());
            chunks.push(bytes.slice(offset..end));
            offset = end;
        }
        chunks
    }
}

#[async_trait]
impl StorageNetwork for MemoryNetwork {
    async fn add(&self, bytes: Bytes) -> NetworkResult<String> {
        let call = self.add_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if lock(&self.failing_adds).contains(&call) {
            return Err(NetworkError::Unavailable(format!("add call {} rejected", call)));
        }

        let cid = Self::content_id(&bytes);
        let chunks = self.split(&bytes);
        lock(&self.objects).insert(
            cid.clone(),
            StoredObject {
                chunks,
                truncated: false,
            },
        );
        tracing::debug!(cid = %cid, len = bytes.len(), "stored object in memory network");
        Ok(cid)
    }

    async fn cat(&self, cid: &str) -> NetworkResult<ChunkStream> {
        self.cat_calls.fetch_add(1, Ordering::SeqCst);
        let object = lock(&self.objects)
            .get(cid)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(cid.to_string()))?;

        let mut items: Vec<NetworkResult<Bytes>> = object.chunks.into_iter().map(Ok).collect();
        if object.truncated {
            items.push(Err(NetworkError::Unavailable(format!(
                "stream for `{}` ended early",
                cid
            ))));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Hands out one shared [`MemoryNetwork`] and counts how often it was asked to.
#[derive(Debug)]
pub struct MemoryConnector {
    network: Arc<MemoryNetwork>,
    connects: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryConnector {
    pub fn new(network: Arc<MemoryNetwork>) -> Self {
        Self {
            network,
            connects: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep this long inside every `connect`, widening the first-use window.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn network(&self) -> Arc<MemoryNetwork> {
        self.network.clone()
    }

    /// Number of connections constructed so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkConnector for MemoryConnector {
    async fn connect(&self, params: &ConnectionParams) -> NetworkResult<Arc<dyn StorageNetwork>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        tracing::info!(host = %params.host, "connected to in-memory storage network");
        let network: Arc<dyn StorageNetwork> = self.network.clone();
        Ok(network)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
