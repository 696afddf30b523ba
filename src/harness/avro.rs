//! S3 Avro Destination Acceptance Test
//!
//! Reads a stream's Avro objects back from the bucket, turns each record into
//! the JSON the user originally sent, and compares dates by calendar day.
//!
//! ## Retrieval
//!
//! ```text
//! list <prefix> ─► for each object (oldest first):
//!     get ─► Reader ─► avro_to_json ─► original names ─► prune ─► push
//! ```

use super::date::assert_date;
use super::s3::{S3DestinationConfig, S3DestinationTestBase};
use super::{DestinationAcceptanceTest, TestDestinationEnv};
use crate::avro::{avro_to_json_bytes, AvroRecordHelper, FieldNameUpdater};
use crate::error::AcceptanceError;
use crate::format::S3Format;
use crate::store::ObjectStore;
use apache_avro::Reader;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info};

/// Acceptance test for an S3 destination writing Avro
pub struct S3AvroDestinationAcceptanceTest {
    base: S3DestinationTestBase,
}

impl S3AvroDestinationAcceptanceTest {
    pub fn new(config: S3DestinationConfig, store: Arc<dyn ObjectStore>) -> Self {
        S3AvroDestinationAcceptanceTest {
            base: S3DestinationTestBase::new(S3Format::Avro, config, store),
        }
    }

    pub fn base(&self) -> &S3DestinationTestBase {
        &self.base
    }

    pub fn setup(&mut self) {
        self.base.setup();
    }

    pub async fn tear_down(&self) -> Result<usize, AcceptanceError> {
        self.base.tear_down().await
    }
}

/// Decode every record of one Avro container into user-facing JSON
fn decode_records(bytes: &[u8], updater: &FieldNameUpdater) -> Result<Vec<Value>, AcceptanceError> {
    let reader = Reader::new(bytes)?;
    let mut records = Vec::new();
    for record in reader {
        let record = record?;
        let json: Value = serde_json::from_slice(&avro_to_json_bytes(&record)?)?;
        let renamed = updater.get_json_with_original_field_names(json);
        records.push(AvroRecordHelper::prune_airbyte_json(renamed)?);
    }
    Ok(records)
}

impl DestinationAcceptanceTest for S3AvroDestinationAcceptanceTest {
    fn format_config(&self) -> Value {
        json!({
            "format_type": "Avro",
            "compression_codec": {
                "codec": "no compression",
                "compression_level": 5,
                "include_checksum": true
            }
        })
    }

    fn retrieve_records<'a>(
        &'a self,
        _env: &'a TestDestinationEnv,
        stream_name: &'a str,
        namespace: Option<&'a str>,
        stream_schema: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, AcceptanceError>> + Send + 'a>> {
        Box::pin(async move {
            let updater =
                AvroRecordHelper::get_field_name_updater(stream_name, namespace, stream_schema)?;
            let objects = self.base.get_all_synced_objects(stream_name, namespace).await?;

            let mut records = Vec::new();
            for object in &objects {
                let bytes = self.base.store().get(&object.key).await?;
                let decoded = decode_records(&bytes, &updater)?;
                debug!(key = %object.key, records = decoded.len(), "Read Avro object");
                records.extend(decoded);
            }

            info!(
                stream = stream_name,
                objects = objects.len(),
                records = records.len(),
                "Retrieved synced records"
            );
            Ok(records)
        })
    }

    fn assert_same_value(
        &self,
        key: &str,
        expected: &Value,
        actual: &Value,
    ) -> Result<(), AcceptanceError> {
        if key == "date" {
            return assert_date(expected, actual);
        }
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
}
