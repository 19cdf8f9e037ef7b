//! Storage adapters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{Storage, StorageError};

/// In-memory storage. Nothing survives the process.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed storage.
///
/// Key-value pairs live in one pretty-printed JSON object. The whole file is
/// read once on open and rewritten on every `set`.
#[derive(Clone)]
pub struct FileStorage {
    path: PathBuf,
    /// In-memory copy of the file; the lock also serializes writes
    cache: Arc<Mutex<HashMap<String, String>>>,
}

impl FileStorage {
    /// Open the storage file at `path`, starting empty if it does not exist.
    ///
    /// An unreadable or corrupt file is logged and treated as empty; it gets
    /// overwritten on the next `set`.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let cache = match tokio::fs::read_to_string(&path).await {
            Ok(data) => match serde_json::from_str::<HashMap<String, String>>(&data) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = ?path, "Failed to parse storage file: {}", e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = ?path, "Failed to read storage file: {}", e);
                HashMap::new()
            }
        };

        tracing::debug!("File storage initialized at: {:?}", path);

        Self {
            path,
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::io("create_dir", e))?;
            }
        }

        let data = serde_json::to_string_pretty(values).map_err(StorageError::serialization)?;

        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| StorageError::io("write", e))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.cache.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut cache = self.cache.lock().await;
        let mut updated = cache.clone();
        updated.insert(key.to_string(), value.to_string());

        // The cache only ever reflects what reached the file
        self.persist(&updated).await?;
        *cache = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::storage_keys;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(storage_keys::REFRESH_TOKEN).await.unwrap(), None);

        storage.set(storage_keys::REFRESH_TOKEN, "rt-1").await.unwrap();
        storage.set(storage_keys::REFRESH_TOKEN, "rt-2").await.unwrap();

        assert_eq!(
            storage.get(storage_keys::REFRESH_TOKEN).await.unwrap().as_deref(),
            Some("rt-2")
        );
    }

    #[tokio::test]
    async fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::open(&path).await;
        storage.set(storage_keys::REFRESH_TOKEN, "persisted").await.unwrap();

        let reopened = FileStorage::open(&path).await;
        assert_eq!(
            reopened.get(storage_keys::REFRESH_TOKEN).await.unwrap().as_deref(),
            Some("persisted")
        );
        assert_eq!(reopened.get(storage_keys::AUTH_TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let storage = FileStorage::open(&path).await;
        assert_eq!(storage.get(storage_keys::REFRESH_TOKEN).await.unwrap(), None);

        storage.set(storage_keys::REFRESH_TOKEN, "fresh").await.unwrap();
        let data = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(data.contains("\"rt\": \"fresh\""));
    }

    #[tokio::test]
    async fn test_file_storage_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be
        let path = dir.path().join("occupied");
        tokio::fs::create_dir(&path).await.unwrap();

        let storage = FileStorage::open(&path).await;
        let err = storage.set(storage_keys::REFRESH_TOKEN, "x").await.unwrap_err();

        assert!(matches!(err, StorageError::Io { operation: "write", .. }));
    }

    #[tokio::test]
    async fn test_file_storage_failed_write_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::open(&path).await;
        storage.set(storage_keys::REFRESH_TOKEN, "kept").await.unwrap();

        // Block the next write by putting a directory where the file was
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();

        assert!(storage.set(storage_keys::REFRESH_TOKEN, "lost").await.is_err());
        assert!(storage.set(storage_keys::AUTH_TOKEN, "lost").await.is_err());

        assert_eq!(
            storage.get(storage_keys::REFRESH_TOKEN).await.unwrap().as_deref(),
            Some("kept")
        );
        assert_eq!(storage.get(storage_keys::AUTH_TOKEN).await.unwrap(), None);
    }
}
