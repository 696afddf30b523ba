//! Destination Acceptance Harness
//!
//! A destination test supplies three things: the format document to sync
//! with, a way to read back what a sync produced, and (optionally) a looser
//! equality for particular fields. The provided methods turn those into a
//! record-by-record comparison against what was sent.
//!
//! ## Layers
//!
//! ```text
//! DestinationAcceptanceTest   generic comparison loop
//!          ▲
//! S3DestinationTestBase       bucket layout, listing, cleanup
//!          ▲
//! S3AvroDestinationAcceptanceTest   Avro config, decoding, date equality
//! ```

pub mod avro;
pub mod date;
pub mod s3;

pub use avro::S3AvroDestinationAcceptanceTest;
pub use date::assert_date;
pub use s3::{S3DestinationConfig, S3DestinationTestBase};

use crate::error::AcceptanceError;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Per-test scratch space
#[derive(Debug, Clone)]
pub struct TestDestinationEnv {
    local_root: PathBuf,
}

impl TestDestinationEnv {
    pub fn new(local_root: impl Into<PathBuf>) -> Self {
        TestDestinationEnv {
            local_root: local_root.into(),
        }
    }

    /// Directory a test may write local files into
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }
}

/// Hooks a destination provides to the acceptance harness
pub trait DestinationAcceptanceTest: Send + Sync {
    /// Format document merged into the destination config under `format`
    fn format_config(&self) -> Value;

    /// Every record the last sync wrote for a stream, in written order
    fn retrieve_records<'a>(
        &'a self,
        env: &'a TestDestinationEnv,
        stream_name: &'a str,
        namespace: Option<&'a str>,
        stream_schema: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, AcceptanceError>> + Send + 'a>>;

    /// Compare one field; strict JSON equality unless overridden
    fn assert_same_value(
        &self,
        key: &str,
        expected: &Value,
        actual: &Value,
    ) -> Result<(), AcceptanceError> {
        if expected == actual {
            Ok(())
        } else {
            Err(AcceptanceError::ValueMismatch {
                key: key.to_string(),
                expected: expected.clone(),
                actual: actual.clone(),
            })
        }
    }

    /// Compare two records field by field
    fn assert_same_data(&self, expected: &Value, actual: &Value) -> Result<(), AcceptanceError> {
        let expected_fields = expected
            .as_object()
            .ok_or_else(|| AcceptanceError::NotAnObject(expected.clone()))?;
        let actual_fields = actual
            .as_object()
            .ok_or_else(|| AcceptanceError::NotAnObject(actual.clone()))?;

        let expected_keys: Vec<String> = expected_fields.keys().cloned().collect();
        let mut actual_keys: Vec<String> = actual_fields.keys().cloned().collect();
        let mut sorted_expected = expected_keys.clone();
        sorted_expected.sort();
        actual_keys.sort();
        if sorted_expected != actual_keys {
            return Err(AcceptanceError::FieldSetMismatch {
                expected: sorted_expected,
                actual: actual_keys,
            });
        }

        for key in &expected_keys {
            self.assert_same_value(key, &expected_fields[key], &actual_fields[key])?;
        }
        Ok(())
    }

    /// Compare record lists pairwise, in order
    fn assert_same_messages(&self, expected: &[Value], actual: &[Value]) -> Result<(), AcceptanceError> {
        if expected.len() != actual.len() {
            return Err(AcceptanceError::RecordCountMismatch {
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        for (expected_record, actual_record) in expected.iter().zip(actual) {
            self.assert_same_data(expected_record, actual_record)?;
        }
        Ok(())
    }

    /// Read a stream back and compare it to what was sent
    fn retrieve_and_verify<'a>(
        &'a self,
        env: &'a TestDestinationEnv,
        stream_name: &'a str,
        namespace: Option<&'a str>,
        stream_schema: &'a Value,
        expected: &'a [Value],
    ) -> Pin<Box<dyn Future<Output = Result<(), AcceptanceError>> + Send + 'a>> {
        Box::pin(async move {
            let actual = self
                .retrieve_records(env, stream_name, namespace, stream_schema)
                .await?;
            tracing::debug!(
                stream = stream_name,
                expected = expected.len(),
                actual = actual.len(),
                "Comparing retrieved records"
            );
            self.assert_same_messages(expected, &actual)
        })
    }
}
