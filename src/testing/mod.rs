//! Stand-in for the destination's write path.
//!
//! `SyncedStreamWriter` lays out Avro objects the way the S3 destination does
//! after a sync, so the read side can be exercised without a live connector.
//!
//! ```text
//! <output_prefix>/<yyyy_MM_dd>_<upload epoch ms>_<part>.avro
//! ```

use crate::avro::{json_to_avro, AvroSchemaConversion, JsonToAvroSchemaConverter, AB_ID_FIELD, EMITTED_AT_FIELD};
use crate::error::AcceptanceError;
use crate::format::{AvroFormatConfig, CompressionCodec};
use crate::store::ObjectStore;
use apache_avro::Writer;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Writes one stream's records as Avro part objects
pub struct SyncedStreamWriter {
    store: Arc<dyn ObjectStore>,
    output_prefix: String,
    conversion: AvroSchemaConversion,
    codec: CompressionCodec,
    part: usize,
}

impl SyncedStreamWriter {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        output_prefix: impl Into<String>,
        stream_name: &str,
        namespace: Option<&str>,
        stream_schema: &Value,
        format_config: &Value,
    ) -> Result<Self, AcceptanceError> {
        let conversion = JsonToAvroSchemaConverter::convert(stream_name, namespace, stream_schema)?;
        let codec = AvroFormatConfig::from_json(format_config)?.compression_codec;
        Ok(SyncedStreamWriter {
            store,
            output_prefix: output_prefix.into().trim_end_matches('/').to_string(),
            conversion,
            codec,
            part: 0,
        })
    }

    /// Avro schema records are written with
    pub fn schema_json(&self) -> &Value {
        &self.conversion.schema_json
    }

    /// Encode `records` into one container and upload it; returns its key
    pub async fn write_part(&mut self, records: &[Value]) -> Result<String, AcceptanceError> {
        let bytes = self.encode(records)?;

        let now = Utc::now();
        let key = format!(
            "{}/{}_{}_{}.avro",
            self.output_prefix,
            now.format("%Y_%m_%d"),
            now.timestamp_millis(),
            self.part
        );
        self.part += 1;

        self.store.put(&key, &bytes).await?;
        debug!(key = %key, records = records.len(), bytes = bytes.len(), "Wrote Avro part");
        Ok(key)
    }

    fn encode(&self, records: &[Value]) -> Result<Vec<u8>, AcceptanceError> {
        let schema = &self.conversion.schema;
        let mut writer = Writer::with_codec(schema, Vec::new(), self.codec.avro_codec()?);
        for record in records {
            let Value::Object(fields) = record else {
                return Err(AcceptanceError::NotAnObject(record.clone()));
            };
            let mut stamped = fields.clone();
            stamped.insert(
                AB_ID_FIELD.to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
            stamped.insert(
                EMITTED_AT_FIELD.to_string(),
                Value::from(Utc::now().timestamp_millis()),
            );
            let value = json_to_avro(&Value::Object(stamped), schema, &self.conversion.name_updater)?;
            writer.append(value)?;
        }
        Ok(writer.into_inner()?)
    }
}
