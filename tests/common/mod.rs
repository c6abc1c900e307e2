#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use logo_resolver::config::{Config, DurableBackend, ProviderConfig, StrategyConfig};
use logo_resolver::errors::{StorageError, StorageResult};
use logo_resolver::providers::ProviderKind;
use logo_resolver::resolver::StrategyKind;
use logo_resolver::services::LogoResolutionService;
use logo_resolver::storage::{
    BlobPutOptions, BlobStore, KeyValueStore, MemoryBlobStore, MemoryKeyValueStore,
};

/// A real PNG of roughly `side * side * 4` bytes; noisy pixels defeat compression
pub fn png_bytes(side: u32) -> Bytes {
    let mut state: u32 = 0x2545_f491;
    let image = image::RgbaImage::from_fn(side, side, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        image::Rgba(state.to_le_bytes())
    });
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    Bytes::from(buffer)
}

/// Path prefix each provider is served under on the mock server
pub fn provider_prefix(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::LogoDev => "/logodev",
        ProviderKind::Clearbit => "/clearbit",
        ProviderKind::DuckDuckGo => "/ddg-icons",
        ProviderKind::GoogleFavicon => "/google-favicons",
        ProviderKind::DirectFavicon => "/site",
    }
}

pub fn strategy_path(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::ClearbitAutocomplete => "/autocomplete",
        StrategyKind::DuckduckgoHtml => "/ddg-html/",
        StrategyKind::DotcomGuess => "/dotcom",
    }
}

/// Config pointing `providers` and every resolver strategy at `server_uri`
pub fn test_config(server_uri: &str, providers: &[ProviderKind]) -> Config {
    let mut config = Config::default();
    config.cache.durable_backend = DurableBackend::Memory;
    config.orchestrator.attempt_timeout = Duration::from_secs(2);
    config.providers = providers
        .iter()
        .map(|kind| {
            ProviderConfig::new(*kind).with_base_url(format!("{server_uri}{}", provider_prefix(*kind)))
        })
        .collect();
    config.resolver.strategies = StrategyKind::ALL
        .iter()
        .map(|kind| StrategyConfig {
            kind: *kind,
            enabled: true,
            base_url: Some(format!("{server_uri}{}", strategy_path(*kind))),
        })
        .collect();
    config
}

/// Service over in-memory stores the test can inspect
pub struct TestHarness {
    pub service: Arc<LogoResolutionService>,
    pub fast: Arc<MemoryKeyValueStore>,
    pub durable: Arc<MemoryBlobStore>,
}

impl TestHarness {
    pub fn new(config: &Config) -> Self {
        let fast = Arc::new(MemoryKeyValueStore::new());
        let durable = Arc::new(MemoryBlobStore::new());
        let service =
            LogoResolutionService::from_parts(config, fast.clone(), durable.clone()).unwrap();
        Self {
            service: Arc::new(service),
            fast,
            durable,
        }
    }
}

/// Key-value store whose writes (and optionally reads) can be made to fail
#[derive(Default)]
pub struct FlakyKv {
    inner: MemoryKeyValueStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FlakyKv {
    pub fn failing_writes() -> Self {
        let kv = Self::default();
        kv.fail_writes.store(true, Ordering::SeqCst);
        kv
    }

    pub fn failing_reads() -> Self {
        let kv = Self::default();
        kv.fail_reads.store(true, Ordering::SeqCst);
        kv
    }
}

#[async_trait]
impl KeyValueStore for FlakyKv {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::backend("flaky-kv", "read refused"));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("flaky-kv", "write refused"));
        }
        self.inner.put(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }
}

/// Blob store that rejects every write
#[derive(Default)]
pub struct FailingBlob {
    inner: MemoryBlobStore,
}

#[async_trait]
impl BlobStore for FailingBlob {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn put(&self, _key: &str, _bytes: Bytes, _options: &BlobPutOptions) -> StorageResult<()> {
        Err(StorageError::backend("failing-blob", "bucket unavailable"))
    }

    async fn head(&self, key: &str) -> StorageResult<bool> {
        self.inner.head(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }
}
