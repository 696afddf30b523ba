//! S3 Object Store Implementation
//!
//! Reads the bucket a destination wrote into. Uses the `object_store` crate
//! from the Arrow ecosystem, which covers AWS S3 and S3-compatible services
//! (MinIO, LocalStack) through a custom endpoint.

use crate::store::config::S3Config;
use crate::store::object_store::{ListResult, ObjectStore, ObjectSummary};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore as ObjectStoreTrait;
use std::future::Future;
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::pin::Pin;
use std::sync::Arc;

/// Objects returned per `list` page
const PAGE_SIZE: usize = 1000;

/// S3-backed object store
#[derive(Clone)]
pub struct S3ObjectStore {
    store: Arc<dyn ObjectStoreTrait>,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3 object store
    ///
    /// Credentials come from the config, falling back to
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    pub fn new(config: &S3Config) -> IoResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let access_key_id = config
            .access_key_id
            .clone()
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok())
            .unwrap_or_default();
        let secret_access_key = config
            .secret_access_key
            .clone()
            .or_else(|| std::env::var("AWS_SECRET_ACCESS_KEY").ok())
            .unwrap_or_default();

        builder = builder
            .with_access_key_id(access_key_id)
            .with_secret_access_key(secret_access_key);

        let store = builder.build().map_err(|e| {
            IoError::new(
                ErrorKind::InvalidInput,
                format!("Failed to create S3 store: {}", e),
            )
        })?;

        Ok(S3ObjectStore {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Wrap an existing `object_store` implementation (for testing)
    pub fn from_store(store: Arc<dyn ObjectStoreTrait>, bucket: impl Into<String>) -> Self {
        S3ObjectStore {
            store,
            bucket: bucket.into(),
        }
    }

    fn map_error(err: object_store::Error) -> IoError {
        match &err {
            object_store::Error::NotFound { .. } => IoError::new(ErrorKind::NotFound, err.to_string()),
            object_store::Error::AlreadyExists { .. } => {
                IoError::new(ErrorKind::AlreadyExists, err.to_string())
            }
            object_store::Error::Precondition { .. } => {
                IoError::new(ErrorKind::InvalidInput, err.to_string())
            }
            _ => IoError::new(ErrorKind::Other, err.to_string()),
        }
    }
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.store
                .put(&ObjectPath::from(key), bytes::Bytes::copy_from_slice(data).into())
                .await
                .map_err(Self::map_error)?;
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            let result = self
                .store
                .get(&ObjectPath::from(key))
                .await
                .map_err(Self::map_error)?;
            let data = result.bytes().await.map_err(Self::map_error)?;
            Ok(data.to_vec())
        })
    }

    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = IoResult<()>> + Send + 'a>> {
        Box::pin(async move {
            match self.store.delete(&ObjectPath::from(key)).await {
                Ok(()) => Ok(()),
                Err(object_store::Error::NotFound { .. }) => Ok(()),
                Err(e) => Err(Self::map_error(e)),
            }
        })
    }

    fn list<'a>(
        &'a self,
        prefix: &'a str,
        continuation_token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = IoResult<ListResult>> + Send + 'a>> {
        Box::pin(async move {
            use futures::TryStreamExt;

            let offset: usize = continuation_token
                .and_then(|t| t.parse().ok())
                .unwrap_or(0);

            // object_store lists whole path segments, so narrow to the
            // string prefix afterwards
            let dir = prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            let dir_path = if dir.is_empty() {
                None
            } else {
                Some(ObjectPath::from(dir))
            };

            let mut all_objects: Vec<_> = self
                .store
                .list(dir_path.as_ref())
                .try_collect()
                .await
                .map_err(Self::map_error)?;
            all_objects.retain(|meta| meta.location.as_ref().starts_with(prefix));
            all_objects.sort_by(|a, b| a.location.as_ref().cmp(b.location.as_ref()));

            let has_more = all_objects.len() > offset + PAGE_SIZE;
            let objects = all_objects
                .into_iter()
                .skip(offset)
                .take(PAGE_SIZE)
                .map(|meta| ObjectSummary {
                    bucket: self.bucket.clone(),
                    key: meta.location.to_string(),
                    size_bytes: meta.size as u64,
                    last_modified_ms: meta
                        .last_modified
                        .timestamp_millis()
                        .try_into()
                        .unwrap_or(0),
                    etag: meta.e_tag,
                })
                .collect();

            Ok(ListResult {
                objects,
                continuation_token: has_more.then(|| (offset + PAGE_SIZE).to_string()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn store() -> S3ObjectStore {
        S3ObjectStore::from_store(Arc::new(InMemory::new()), "test-bucket")
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = store();
        store.put("out/users/a.avro", b"abc").await.unwrap();
        assert_eq!(store.get("out/users/a.avro").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_get_missing_maps_to_not_found() {
        let err = store().get("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_narrows_to_string_prefix() {
        let store = store();
        store.put("out/users/a.avro", b"1").await.unwrap();
        store.put("out/users_v2/b.avro", b"2").await.unwrap();
        store.put("out/orders/c.avro", b"3").await.unwrap();

        let result = store.list("out/users", None).await.unwrap();
        let keys: Vec<_> = result.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["out/users/a.avro", "out/users_v2/b.avro"]);
        assert!(result.objects.iter().all(|o| o.bucket == "test-bucket"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store();
        store.put("k", b"v").await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.list("", None).await.unwrap().objects.is_empty());
    }
}
