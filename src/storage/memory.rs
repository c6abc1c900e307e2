//! In-process store adapters
//!
//! Used by tests and single-instance deployments. An expired key is dropped
//! the next time it is read, and every [`SWEEP_INTERVAL`] writes the whole map
//! is swept so keys that are written once and never read again (rate-limit
//! counters) do not accumulate.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::{BlobPutOptions, BlobStore, KeyValueStore};
use crate::errors::StorageResult;

#[derive(Debug, Clone)]
struct KvEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Writes between full sweeps of expired keys
pub const SWEEP_INTERVAL: usize = 256;

/// Key-value store backed by a `HashMap` with TTL support
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, KvEntry>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Physically remove every expired key, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired keys, {} remain", purged, entries.len());
        }
        purged
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            trace!("Expiring key {}", key);
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StorageResult<()> {
        // a TTL too large to represent never expires
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries
            .write()
            .await
            .insert(key.to_string(), KvEntry { value, expires_at });

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            self.purge_expired().await;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Bytes,
    options: BlobPutOptions,
}

/// Blob store backed by a `HashMap`
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options the blob was last written with
    pub async fn options(&self, key: &str) -> Option<BlobPutOptions> {
        self.blobs
            .read()
            .await
            .get(key)
            .map(|blob| blob.options.clone())
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        Ok(self.blobs.read().await.get(key).map(|blob| blob.bytes.clone()))
    }

    async fn put(&self, key: &str, bytes: Bytes, options: &BlobPutOptions) -> StorageResult<()> {
        self.blobs.write().await.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                options: options.clone(),
            },
        );
        Ok(())
    }

    async fn head(&self, key: &str) -> StorageResult<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.blobs.write().await.remove(key);
        Ok(())
    }
}
