//! Object Storage
//!
//! Where a destination's synced files are read back from. Keys are laid out
//! as `<bucket_path>/<namespace>/<stream>/<file>` by the writer side; this
//! module only knows about buckets and keys.

pub mod config;
pub mod object_store;
#[cfg(feature = "s3")]
pub mod s3_store;

pub use config::{build_store, ObjectStoreType, S3Config, StoreConfig};
pub use object_store::{InMemoryObjectStore, ListResult, LocalFsObjectStore, ObjectStore, ObjectSummary};
#[cfg(feature = "s3")]
pub use s3_store::S3ObjectStore;
