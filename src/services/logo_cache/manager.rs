//! Cache manager: lookup, store and invalidate across both tiers

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::headers::CACHE_CONTROL_IMMUTABLE;
use super::key::CacheKey;
use crate::config::CacheConfig;
use crate::errors::{StorageError, StorageResult};
use crate::models::LogoMetadata;
use crate::storage::{BlobPutOptions, BlobStore, KeyValueStore};

/// A fresh cache hit
#[derive(Debug, Clone, PartialEq)]
pub struct CachedLogo {
    pub bytes: Bytes,
    pub metadata: LogoMetadata,
}

/// Where a metadata record was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataSource {
    Fast,
    Durable,
}

/// Reads and writes logos across the fast and durable tiers
///
/// The manager is the only writer of [`LogoMetadata`]. Every failure on the
/// read path degrades to a miss; only durable-tier write failures are reported
/// to the caller.
pub struct CacheManager {
    fast: Arc<dyn KeyValueStore>,
    durable: Arc<dyn BlobStore>,
    max_age: chrono::Duration,
    fast_tier_ttl: Duration,
}

impl CacheManager {
    pub fn new(
        fast: Arc<dyn KeyValueStore>,
        durable: Arc<dyn BlobStore>,
        max_age: Duration,
        fast_tier_ttl: Duration,
    ) -> Self {
        Self {
            fast,
            durable,
            max_age: chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX),
            fast_tier_ttl,
        }
    }

    pub fn from_config(
        config: &CacheConfig,
        fast: Arc<dyn KeyValueStore>,
        durable: Arc<dyn BlobStore>,
    ) -> Self {
        Self::new(fast, durable, config.max_age, config.fast_tier_ttl)
    }

    pub fn max_age(&self) -> chrono::Duration {
        self.max_age
    }

    /// Look up a logo using the wall clock
    pub async fn lookup(&self, key: &CacheKey) -> Option<CachedLogo> {
        self.lookup_at(key, Utc::now()).await
    }

    /// Look up a logo as of `now`
    ///
    /// Stale entries are deleted from both tiers before the miss is reported.
    pub async fn lookup_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CachedLogo> {
        let (metadata, source) = self.read_metadata(key).await?;

        let age = metadata.age_at(now);
        if age > self.max_age {
            info!(
                cache_key = %key,
                age_days = age.num_days(),
                "Cached logo is stale, invalidating"
            );
            if let Err(e) = self.invalidate(key).await {
                warn!(cache_key = %key, "Failed to invalidate stale logo: {}", e);
            }
            return None;
        }

        let bytes = match self.durable.get(key.as_str()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(cache_key = %key, "Metadata present but blob missing, treating as miss");
                return None;
            }
            Err(e) => {
                warn!(cache_key = %key, "Durable tier read failed, treating as miss: {}", e);
                return None;
            }
        };

        if source == MetadataSource::Durable {
            self.write_fast_metadata(key, &metadata).await;
        }

        debug!(cache_key = %key, bytes = bytes.len(), "Cache hit");
        Some(CachedLogo { bytes, metadata })
    }

    /// Store a logo and its metadata
    ///
    /// The blob goes first; if the durable tier rejects it nothing else is
    /// written. Fast-tier failures are logged and swallowed because lookups
    /// fall back to the durable sidecar.
    pub async fn store(
        &self,
        key: &CacheKey,
        bytes: Bytes,
        metadata: &LogoMetadata,
    ) -> StorageResult<()> {
        let retrieved_at = metadata
            .retrieved_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let blob_options = BlobPutOptions::new(metadata.mime_type())
            .cache_control(CACHE_CONTROL_IMMUTABLE)
            .metadata("retrieved-at", retrieved_at);

        self.durable
            .put(key.as_str(), bytes, &blob_options)
            .await
            .inspect_err(|e| warn!(cache_key = %key, "Durable blob write failed: {}", e))?;

        let metadata_json = serde_json::to_string(metadata)?;
        let sidecar_options = BlobPutOptions::new("application/json");
        self.durable
            .put(
                &key.sidecar_key(),
                Bytes::from(metadata_json.clone()),
                &sidecar_options,
            )
            .await
            .inspect_err(|e| warn!(cache_key = %key, "Durable sidecar write failed: {}", e))?;

        if let Err(e) = self
            .fast
            .put(&key.metadata_key(), metadata_json, Some(self.fast_tier_ttl))
            .await
        {
            warn!(cache_key = %key, "Fast tier write failed, durable tier remains authoritative: {}", e);
        }

        debug!(cache_key = %key, provider = %metadata.provider, "Stored logo");
        Ok(())
    }

    /// Remove a logo from both tiers
    ///
    /// Every delete is attempted; the first failure is returned.
    pub async fn invalidate(&self, key: &CacheKey) -> StorageResult<()> {
        let results = [
            self.fast.delete(&key.metadata_key()).await,
            self.durable.delete(&key.sidecar_key()).await,
            self.durable.delete(key.as_str()).await,
        ];

        let mut first_error: Option<StorageError> = None;
        for result in results {
            if let Err(e) = result {
                warn!(cache_key = %key, "Invalidation step failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(cache_key = %key, "Invalidated");
                Ok(())
            }
        }
    }

    async fn read_metadata(&self, key: &CacheKey) -> Option<(LogoMetadata, MetadataSource)> {
        match self.fast.get(&key.metadata_key()).await {
            Ok(Some(json)) => match serde_json::from_str::<LogoMetadata>(&json) {
                Ok(metadata) => return Some((metadata, MetadataSource::Fast)),
                Err(e) => warn!(cache_key = %key, "Unreadable fast-tier metadata: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!(cache_key = %key, "Fast tier read failed: {}", e),
        }

        match self.durable.get(&key.sidecar_key()).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<LogoMetadata>(&bytes) {
                Ok(metadata) => Some((metadata, MetadataSource::Durable)),
                Err(e) => {
                    warn!(cache_key = %key, "Unreadable metadata sidecar: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key = %key, "Durable sidecar read failed: {}", e);
                None
            }
        }
    }

    async fn write_fast_metadata(&self, key: &CacheKey, metadata: &LogoMetadata) {
        let json = match serde_json::to_string(metadata) {
            Ok(json) => json,
            Err(e) => {
                warn!(cache_key = %key, "Failed to serialize metadata: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .fast
            .put(&key.metadata_key(), json, Some(self.fast_tier_ttl))
            .await
        {
            debug!(cache_key = %key, "Fast tier back-fill failed: {}", e);
        }
    }
}
