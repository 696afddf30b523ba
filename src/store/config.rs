//! Object Store Configuration
//!
//! Selects which backend the harness reads synced objects from.

use crate::store::object_store::{InMemoryObjectStore, LocalFsObjectStore, ObjectStore};
use serde::{Deserialize, Serialize};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Type of object store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectStoreType {
    /// In-memory store (for tests)
    InMemory,
    /// Local filesystem
    LocalFs,
    /// Amazon S3 or compatible
    S3,
}

/// S3 connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom endpoint (for S3-compatible services like MinIO)
    pub endpoint: Option<String>,
    /// Access key; falls back to `AWS_ACCESS_KEY_ID`
    pub access_key_id: Option<String>,
    /// Secret key; falls back to `AWS_SECRET_ACCESS_KEY`
    pub secret_access_key: Option<String>,
}

/// Backend selection plus the settings that backend needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Object store type
    pub store_type: ObjectStoreType,
    /// Root directory (for LocalFs store)
    pub local_path: Option<PathBuf>,
    /// Bucket and connection settings
    pub s3: S3Config,
}

impl StoreConfig {
    /// In-memory bucket for tests
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        StoreConfig {
            store_type: ObjectStoreType::InMemory,
            local_path: None,
            s3: S3Config {
                bucket: bucket.into(),
                region: String::new(),
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
            },
        }
    }

    /// Bucket directory under `root` on the local filesystem
    pub fn local(root: PathBuf, bucket: impl Into<String>) -> Self {
        StoreConfig {
            store_type: ObjectStoreType::LocalFs,
            local_path: Some(root),
            ..Self::in_memory(bucket)
        }
    }

    /// Real S3 bucket
    pub fn s3(s3: S3Config) -> Self {
        StoreConfig {
            store_type: ObjectStoreType::S3,
            local_path: None,
            s3,
        }
    }
}

/// Build the configured object store
pub fn build_store(config: &StoreConfig) -> IoResult<Arc<dyn ObjectStore>> {
    match config.store_type {
        ObjectStoreType::InMemory => Ok(Arc::new(InMemoryObjectStore::new(&config.s3.bucket))),
        ObjectStoreType::LocalFs => {
            let root = config.local_path.as_ref().ok_or_else(|| {
                IoError::new(ErrorKind::InvalidInput, "LocalFs store requires local_path")
            })?;
            Ok(Arc::new(LocalFsObjectStore::new(root, &config.s3.bucket)))
        }
        #[cfg(feature = "s3")]
        ObjectStoreType::S3 => Ok(Arc::new(crate::store::s3_store::S3ObjectStore::new(
            &config.s3,
        )?)),
        #[cfg(not(feature = "s3"))]
        ObjectStoreType::S3 => Err(IoError::new(
            ErrorKind::Unsupported,
            "S3 store requires the `s3` feature",
        )),
    }
}
