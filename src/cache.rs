use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised by a [`CacheStore`] backend.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// The background write task panicked or was aborted.
    #[error("cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Persistent storage for raw bracket pages, keyed by [`derive_cache_key`](crate::derive_cache_key).
///
/// Implementations must make `put` all-or-nothing: a reader never observes a
/// partially written document.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), CacheError>;
}

/// Stores each key as a file below a root directory.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path).await.map_err(io_error(&path))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let content = content.to_vec();
        debug!(path = %path.display(), len = content.len(), "writing cache entry");

        // Runs to completion even if the awaiting future is dropped, and the
        // rename is atomic, so the entry is either fully written or absent.
        tokio::task::spawn_blocking(move || {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir).map_err(io_error(dir))?;
            let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error(dir))?;
            file.write_all(&content).map_err(io_error(file.path()))?;
            file.persist(&path).map_err(|e| io_error(&path)(e.error))?;
            Ok::<(), CacheError>(())
        })
        .await?
    }
}

/// In-process store, useful for tests and short-lived hosts.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.lock().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), CacheError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), content.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_store_round_trips_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let key = "t/(root)/cup.html";

        assert!(!store.exists(key).await.unwrap());
        assert_eq!(store.get(key).await.unwrap(), None);

        store.put(key, b"<html></html>").await.unwrap();
        assert!(store.exists(key).await.unwrap());
        assert_eq!(store.get(key).await.unwrap().unwrap(), b"<html></html>");
        assert!(dir.path().join("t").join("(root)").join("cup.html").is_file());
    }

    #[tokio::test]
    async fn fs_store_overwrites_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        store.put("t/org/cup.html", b"old").await.unwrap();
        store.put("t/org/cup.html", b"new").await.unwrap();
        assert_eq!(store.get("t/org/cup.html").await.unwrap().unwrap(), b"new");

        let leftovers = std::fs::read_dir(dir.path().join("t").join("org"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryCacheStore::new();
        assert!(store.is_empty().await);
        store.put("t/org/cup.html", b"abc").await.unwrap();
        assert!(store.exists("t/org/cup.html").await.unwrap());
        assert_eq!(store.get("t/org/cup.html").await.unwrap().unwrap(), b"abc");
        assert_eq!(store.len().await, 1);
    }
}
