//! Object Store Abstraction
//!
//! A trait-based view of the bucket a destination writes into. The acceptance
//! harness only needs to list what a sync produced, download it, and clean up
//! afterwards; `put` exists so tests can stand in for the connector.
//!
//! Implementations:
//! - `InMemoryObjectStore`: For unit tests
//! - `LocalFsObjectStore`: For local runs against a directory tree
//! - `S3ObjectStore`: For real buckets (feature-gated)

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

/// Locator and metadata for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Bucket the object lives in
    pub bucket: String,
    /// Object key (path within the bucket)
    pub key: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Last modification timestamp (Unix ms)
    pub last_modified_ms: u64,
    /// ETag or content hash (optional)
    pub etag: Option<String>,
}

/// Result of a list operation
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    /// Objects matching the prefix
    pub objects: Vec<ObjectSummary>,
    /// Continuation token for pagination (if more results exist)
    pub continuation_token: Option<String>,
}

/// Object store abstraction trait
pub trait ObjectStore: Send + Sync + 'static {
    /// Name of the bucket this store reads and writes
    fn bucket(&self) -> &str;

    /// Put an object (create or overwrite)
    fn put<'a>(
        &'a self,
        key: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>>;

    /// Get an object's full contents
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<Vec<u8>>> + Send + 'a>>;

    /// Delete an object (missing objects are not an error)
    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>>;

    /// List objects with a prefix, sorted by key
    fn list<'a>(
        &'a self,
        prefix: &'a str,
        continuation_token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = IoResult<ListResult>> + Send + 'a>>;
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// InMemoryObjectStore - For tests
// ============================================================================

/// In-memory object store for unit and integration tests
#[derive(Debug)]
pub struct InMemoryObjectStore {
    bucket: String,
    data: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified_ms: u64,
}

impl InMemoryObjectStore {
    /// Create a new, empty in-memory bucket
    pub fn new(bucket: impl Into<String>) -> Self {
        InMemoryObjectStore {
            bucket: bucket.into(),
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Get the number of stored objects (for testing)
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Overwrite an object's modification time (for ordering tests)
    pub fn set_last_modified(&self, key: &str, last_modified_ms: u64) -> IoResult<()> {
        match self.data.write().get_mut(key) {
            Some(obj) => {
                obj.last_modified_ms = last_modified_ms;
                Ok(())
            }
            None => Err(IoError::new(
                ErrorKind::NotFound,
                format!("Key not found: {}", key),
            )),
        }
    }
}

impl Clone for InMemoryObjectStore {
    fn clone(&self) -> Self {
        InMemoryObjectStore {
            bucket: self.bucket.clone(),
            data: Arc::clone(&self.data),
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let obj = StoredObject {
                data: data.to_vec(),
                last_modified_ms: now_ms(),
            };
            self.data.write().insert(key.to_string(), obj);
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            self.data
                .read()
                .get(key)
                .map(|obj| obj.data.clone())
                .ok_or_else(|| IoError::new(ErrorKind::NotFound, format!("Key not found: {}", key)))
        })
    }

    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.data.write().remove(key);
            Ok(())
        })
    }

    fn list<'a>(
        &'a self,
        prefix: &'a str,
        _continuation_token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = IoResult<ListResult>> + Send + 'a>> {
        Box::pin(async move {
            // BTreeMap iteration is already key-ordered
            let objects = self
                .data
                .read()
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| ObjectSummary {
                    bucket: self.bucket.clone(),
                    key: k.clone(),
                    size_bytes: v.data.len() as u64,
                    last_modified_ms: v.last_modified_ms,
                    etag: None,
                })
                .collect();

            Ok(ListResult {
                objects,
                continuation_token: None,
            })
        })
    }
}

// ============================================================================
// LocalFsObjectStore - For local runs
// ============================================================================

/// Local filesystem object store laid out as `<root>/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct LocalFsObjectStore {
    bucket: String,
    bucket_path: PathBuf,
}

impl LocalFsObjectStore {
    /// Create a store for `bucket` under `root`
    pub fn new(root: impl AsRef<Path>, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let bucket_path = root.as_ref().join(&bucket);
        LocalFsObjectStore {
            bucket,
            bucket_path,
        }
    }

    /// Directory holding this bucket's objects
    pub fn bucket_path(&self) -> &Path {
        &self.bucket_path
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.bucket_path.join(key)
    }

    fn ensure_parent(path: &Path) -> IoResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn walk_dir(&self, dir: &Path, prefix: &str, objects: &mut Vec<ObjectSummary>) -> IoResult<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if path.is_dir() {
                self.walk_dir(&path, prefix, objects)?;
            } else if path.is_file() {
                let relative = path.strip_prefix(&self.bucket_path).map_err(|_| {
                    IoError::new(
                        ErrorKind::InvalidData,
                        format!("{} is outside the bucket directory", path.display()),
                    )
                })?;
                // Keys always use '/' regardless of platform separator
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if key.starts_with(prefix) {
                    let metadata = std::fs::metadata(&path)?;
                    objects.push(ObjectSummary {
                        bucket: self.bucket.clone(),
                        key,
                        size_bytes: metadata.len(),
                        last_modified_ms: metadata
                            .modified()
                            .ok()
                            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                            .map(|d| d.as_millis() as u64)
                            .unwrap_or(0),
                        etag: None,
                    });
                }
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalFsObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let path = self.full_path(key);
            Self::ensure_parent(&path)?;
            tokio::fs::write(&path, data).await
        })
    }

    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move { tokio::fs::read(self.full_path(key)).await })
    }

    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::fs::remove_file(self.full_path(key)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            }
        })
    }

    fn list<'a>(
        &'a self,
        prefix: &'a str,
        _continuation_token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = IoResult<ListResult>> + Send + 'a>> {
        Box::pin(async move {
            if !self.bucket_path.exists() {
                return Ok(ListResult::default());
            }

            // Walk from the deepest directory the prefix fully names
            let prefix_path = self.full_path(prefix);
            let search_dir = if prefix.is_empty() || prefix.ends_with('/') {
                prefix_path
            } else {
                prefix_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.bucket_path.clone())
            };

            if !search_dir.is_dir() {
                return Ok(ListResult::default());
            }

            let mut objects = Vec::new();
            self.walk_dir(&search_dir, prefix, &mut objects)?;
            objects.sort_by(|a, b| a.key.cmp(&b.key));

            Ok(ListResult {
                objects,
                continuation_token: None,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inmemory_put_get() {
        let store = InMemoryObjectStore::new("bucket");

        store.put("test/key1", b"hello world").await.unwrap();
        let data = store.get("test/key1").await.unwrap();

        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn test_inmemory_get_missing() {
        let store = InMemoryObjectStore::new("bucket");
        let err = store.get("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_inmemory_delete() {
        let store = InMemoryObjectStore::new("bucket");

        store.put("test/key1", b"data").await.unwrap();
        store.delete("test/key1").await.unwrap();
        assert!(store.is_empty());

        // Deleting again is fine
        store.delete("test/key1").await.unwrap();
    }

    #[tokio::test]
    async fn test_inmemory_list() {
        let store = InMemoryObjectStore::new("bucket");

        store.put("out/users/b.avro", b"data2").await.unwrap();
        store.put("out/users/a.avro", b"data1").await.unwrap();
        store.put("out/orders/a.avro", b"data3").await.unwrap();

        let result = store.list("out/users/", None).await.unwrap();
        let keys: Vec<_> = result.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["out/users/a.avro", "out/users/b.avro"]);
        assert!(result.objects.iter().all(|o| o.bucket == "bucket"));
        assert!(result.continuation_token.is_none());
    }

    #[tokio::test]
    async fn test_inmemory_set_last_modified() {
        let store = InMemoryObjectStore::new("bucket");
        store.put("k", b"v").await.unwrap();
        store.set_last_modified("k", 42).unwrap();

        let result = store.list("", None).await.unwrap();
        assert_eq!(result.objects[0].last_modified_ms, 42);
        assert!(store.set_last_modified("missing", 1).is_err());
    }

    #[tokio::test]
    async fn test_localfs_put_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsObjectStore::new(dir.path(), "bucket");

        store.put("test/key1.txt", b"hello world").await.unwrap();
        let data = store.get("test/key1.txt").await.unwrap();

        assert_eq!(data, b"hello world");
        assert!(store.bucket_path().join("test/key1.txt").exists());
    }

    #[tokio::test]
    async fn test_localfs_list_with_partial_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsObjectStore::new(dir.path(), "bucket");

        store.put("out/users/part-1.avro", b"data1").await.unwrap();
        store.put("out/users/part-0.avro", b"data2").await.unwrap();
        store.put("out/users_archive/x.avro", b"data3").await.unwrap();

        let result = store.list("out/users", None).await.unwrap();
        let keys: Vec<_> = result.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "out/users/part-0.avro",
                "out/users/part-1.avro",
                "out/users_archive/x.avro"
            ]
        );
    }

    #[tokio::test]
    async fn test_localfs_list_missing_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsObjectStore::new(dir.path(), "empty");

        let result = store.list("anything/", None).await.unwrap();
        assert!(result.objects.is_empty());
    }

    #[tokio::test]
    async fn test_localfs_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsObjectStore::new(dir.path(), "bucket");

        store.put("a/b.avro", b"data").await.unwrap();
        store.delete("a/b.avro").await.unwrap();
        store.delete("a/b.avro").await.unwrap();

        let result = store.list("a/", None).await.unwrap();
        assert!(result.objects.is_empty());
    }
}
