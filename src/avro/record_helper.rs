//! Helpers for turning decoded destination records back into user records.

use super::name_updater::FieldNameUpdater;
use super::schema::{JsonToAvroSchemaConverter, AB_ID_FIELD, EMITTED_AT_FIELD};
use crate::error::AcceptanceError;
use serde_json::Value;

pub struct AvroRecordHelper;

impl AvroRecordHelper {
    /// Name updater for the Avro schema the destination derives from
    /// `stream_schema`
    pub fn get_field_name_updater(
        stream_name: &str,
        namespace: Option<&str>,
        stream_schema: &Value,
    ) -> Result<FieldNameUpdater, AcceptanceError> {
        Ok(JsonToAvroSchemaConverter::convert(stream_name, namespace, stream_schema)?.name_updater)
    }

    /// Drop destination bookkeeping from a decoded record.
    ///
    /// Removes the id and emission columns, then every null-valued field at
    /// any object depth: nullable Avro fields come back as explicit nulls for
    /// keys the original record never had.
    pub fn prune_airbyte_json(input: Value) -> Result<Value, AcceptanceError> {
        let Value::Object(mut fields) = input else {
            return Err(AcceptanceError::NotAnObject(input));
        };
        fields.remove(AB_ID_FIELD);
        fields.remove(EMITTED_AT_FIELD);
        Ok(prune_nulls(Value::Object(fields)))
    }
}

fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
        other => other,
    }
}
