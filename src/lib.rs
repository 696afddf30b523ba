//! Acceptance testing for an S3 destination that writes Avro.
//!
//! A sync writes each stream under `<bucket_path>/<namespace>/<stream>/` as
//! Avro container objects. This crate reads those objects back, undoes the
//! destination's field renames and bookkeeping columns, and compares the
//! result to the records that were sent.

pub mod avro;
pub mod error;
pub mod format;
pub mod harness;
pub mod observability;
pub mod store;
pub mod testing;

pub use error::AcceptanceError;
pub use format::{AvroFormatConfig, CompressionCodec, S3Format};
pub use harness::{
    DestinationAcceptanceTest, S3AvroDestinationAcceptanceTest, S3DestinationConfig,
    S3DestinationTestBase, TestDestinationEnv,
};
pub use observability::{init_logging, LogConfig};
pub use store::{build_store, ObjectStore, StoreConfig};
pub use testing::SyncedStreamWriter;
