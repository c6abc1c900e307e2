//! Store adapters for the two cache tiers
//!
//! The fast tier is a key-value store holding small strings with an optional
//! TTL. The durable tier is a blob store holding logo bytes and JSON sidecars.
//! The two are independent: nothing here keeps them consistent with each
//! other, that is the cache manager's job.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::StorageResult;

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemBlobStore;
pub use memory::{MemoryBlobStore, MemoryKeyValueStore};

/// Low-latency string store with per-key expiry
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` for missing or expired keys
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Overwrites any existing value; `ttl = None` never expires
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StorageResult<()>;

    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Options attached to a blob write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobPutOptions {
    pub content_type: String,
    pub cache_control: Option<String>,
    pub custom_metadata: BTreeMap<String, String>,
}

impl BlobPutOptions {
    pub fn new<S: Into<String>>(content_type: S) -> Self {
        Self {
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    pub fn cache_control<S: Into<String>>(mut self, value: S) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.custom_metadata.insert(key.into(), value.into());
        self
    }
}

/// Durable object store, the authoritative long-term tier
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>>;

    async fn put(&self, key: &str, bytes: Bytes, options: &BlobPutOptions) -> StorageResult<()>;

    async fn head(&self, key: &str) -> StorageResult<bool>;

    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
