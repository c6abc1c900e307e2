mod common;

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;

use common::{FailingBlob, FlakyKv};
use logo_resolver::models::{LogoFormat, LogoIdentity, LogoMetadata, LogoRequest};
use logo_resolver::services::{CacheKey, CacheManager};
use logo_resolver::storage::{BlobStore, FilesystemBlobStore, KeyValueStore, MemoryBlobStore, MemoryKeyValueStore};

const DAY: Duration = Duration::from_secs(24 * 3600);

fn metadata() -> LogoMetadata {
    LogoMetadata {
        identity: LogoIdentity::Domain("example.com".to_string()),
        provider: "logo.dev".to_string(),
        format: LogoFormat::Png,
        size: Some(128),
        greyscale: false,
        source_url: "https://img.logo.dev/example.com?format=png&size=128".to_string(),
        content_type: Some("image/png".to_string()),
        retrieved_at: Utc::now(),
        latency_ms: 40,
        byte_size: 4,
        width: None,
        height: None,
    }
}

fn key() -> CacheKey {
    CacheKey::for_request(&LogoRequest::for_domain("example.com").with_size(128)).unwrap()
}

#[test]
fn test_equivalent_requests_share_a_key() {
    let spellings = ["example.com", "HTTPS://WWW.Example.COM/path", "www.example.com", "http://example.com/"];
    for spelling in spellings {
        let request = LogoRequest::for_domain(spelling).normalized().unwrap();
        assert_eq!(
            CacheKey::for_request(&request).unwrap().as_str(),
            "domain/example.com/png",
            "{spelling}"
        );
    }
}

#[tokio::test]
async fn test_durable_failure_writes_no_metadata() {
    let fast = Arc::new(MemoryKeyValueStore::new());
    let manager = CacheManager::new(fast.clone(), Arc::new(FailingBlob::default()), 30 * DAY, 365 * DAY);

    let result = manager.store(&key(), Bytes::from_static(b"logo"), &metadata()).await;
    assert!(result.is_err());
    assert!(fast.is_empty().await);
    assert!(manager.lookup(&key()).await.is_none());
}

#[tokio::test]
async fn test_fast_tier_write_failure_is_not_fatal() {
    let fast = Arc::new(FlakyKv::failing_writes());
    let durable = Arc::new(MemoryBlobStore::new());
    let manager = CacheManager::new(fast.clone(), durable.clone(), 30 * DAY, 365 * DAY);

    manager
        .store(&key(), Bytes::from_static(b"logo"), &metadata())
        .await
        .unwrap();
    assert!(fast.get(&key().metadata_key()).await.unwrap().is_none());

    // served from the durable sidecar instead
    let hit = manager.lookup(&key()).await.unwrap();
    assert_eq!(hit.bytes, Bytes::from_static(b"logo"));
}

#[tokio::test]
async fn test_fast_tier_read_failure_falls_back_to_durable() {
    let fast = Arc::new(FlakyKv::default());
    let durable = Arc::new(MemoryBlobStore::new());
    let manager = CacheManager::new(fast.clone(), durable.clone(), 30 * DAY, 365 * DAY);
    manager
        .store(&key(), Bytes::from_static(b"logo"), &metadata())
        .await
        .unwrap();

    fast.fail_reads.store(true, Ordering::SeqCst);
    assert!(manager.lookup(&key()).await.is_some());
}

#[tokio::test]
async fn test_filesystem_durable_tier_survives_restart() {
    let dir = TempDir::new().unwrap();
    let meta = metadata();

    {
        let durable = Arc::new(FilesystemBlobStore::new(dir.path()).await.unwrap());
        let manager = CacheManager::new(Arc::new(MemoryKeyValueStore::new()), durable, 30 * DAY, 365 * DAY);
        manager
            .store(&key(), Bytes::from_static(b"logo"), &meta)
            .await
            .unwrap();
    }

    // fresh fast tier, same directory
    let fast = Arc::new(MemoryKeyValueStore::new());
    let durable = Arc::new(FilesystemBlobStore::new(dir.path()).await.unwrap());
    let manager = CacheManager::new(fast.clone(), durable.clone(), 30 * DAY, 365 * DAY);

    let hit = manager.lookup(&key()).await.unwrap();
    assert_eq!(hit.bytes, Bytes::from_static(b"logo"));
    assert_eq!(hit.metadata, meta);
    assert!(durable.head(&key().sidecar_key()).await.unwrap());
    assert!(fast.get(&key().metadata_key()).await.unwrap().is_some());
}
