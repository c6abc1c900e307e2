//! Disk-backed durable tier
//!
//! Each blob is a file under the base directory at the path given by its key;
//! the write options are kept next to it in `<file>.attrs.json`. Writes go to a
//! temporary file first and are renamed into place, so a reader never sees a
//! partially written logo. Every write gets its own temporary name, so
//! overlapping writes to one key all succeed and the last rename wins.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

use super::{BlobPutOptions, BlobStore};
use crate::errors::{StorageError, StorageResult};

const ATTRS_SUFFIX: &str = ".attrs.json";
const TEMP_SUFFIX: &str = ".tmp";

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct BlobAttributes {
    content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    custom_metadata: BTreeMap<String, String>,
}

/// Blob store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    base_directory: PathBuf,
}

impl FilesystemBlobStore {
    /// Create the store, creating the base directory if needed
    pub async fn new<P: AsRef<Path>>(base_directory: P) -> StorageResult<Self> {
        let base_directory = base_directory.as_ref().to_path_buf();
        fs::create_dir_all(&base_directory).await?;
        debug!("Filesystem blob store at {}", base_directory.display());
        Ok(Self { base_directory })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Map a key to a path, refusing anything that could escape the base directory
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let is_safe = !key.is_empty()
            && !key.contains('\0')
            && !key.ends_with(ATTRS_SUFFIX)
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_safe {
            return Err(StorageError::backend(
                "filesystem",
                format!("invalid blob key '{key}'"),
            ));
        }
        Ok(self.base_directory.join(relative))
    }

    fn attrs_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(ATTRS_SUFFIX);
        PathBuf::from(name)
    }

    async fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut temp = path.as_os_str().to_owned();
        temp.push(format!(
            ".{}.{}{}",
            std::process::id(),
            TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            TEMP_SUFFIX
        ));
        let temp = PathBuf::from(temp);

        fs::write(&temp, contents).await?;
        if let Err(e) = fs::rename(&temp, path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove_if_exists(path: &Path) -> StorageResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, options: &BlobPutOptions) -> StorageResult<()> {
        let path = self.path_for(key)?;
        Self::write_atomic(&path, &bytes).await?;

        let attributes = BlobAttributes {
            content_type: options.content_type.clone(),
            cache_control: options.cache_control.clone(),
            custom_metadata: options.custom_metadata.clone(),
        };
        let attrs_json = serde_json::to_vec(&attributes)?;
        if let Err(e) = Self::write_atomic(&Self::attrs_path(&path), &attrs_json).await {
            // The blob itself is readable without its attributes
            warn!("Failed to write attributes for blob {}: {}", key, e);
        }
        Ok(())
    }

    async fn head(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        Self::remove_if_exists(&path).await?;
        Self::remove_if_exists(&Self::attrs_path(&path)).await
    }
}
