//! JSON schema → Avro schema conversion
//!
//! Derives the Avro record schema a destination writes for a stream. The
//! conversion renames fields to Avro-safe identifiers, so it also produces
//! the [`FieldNameUpdater`] that reverses those renames on read.
//!
//! ## Type Mapping
//!
//! ```text
//! string                     → string
//! string, format: date       → int (date)
//! string, format: date-time  → long (timestamp-micros)
//! string, format: time       → long (time-micros)
//! integer                    → long
//! number                     → double
//! boolean                    → boolean
//! object with properties     → nested record
//! array                      → array of nullable items (default string)
//! anything else              → string
//! ```
//!
//! Every user field is a `["null", T]` union defaulting to null.

use super::name_updater::FieldNameUpdater;
use super::names::AvroNameTransformer;
use crate::error::AcceptanceError;
use apache_avro::Schema;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Record id column written by the destination
pub const AB_ID_FIELD: &str = "_airbyte_ab_id";
/// Emission timestamp column written by the destination
pub const EMITTED_AT_FIELD: &str = "_airbyte_emitted_at";
/// Catch-all map for properties missing from the schema
pub const ADDITIONAL_PROPERTIES_FIELD: &str = "_airbyte_additional_properties";
/// Doc prefix recording a renamed field's original name
pub const DOC_KEY_ORIGINAL_NAME: &str = "_airbyte_original_name";

/// Result of converting a stream's JSON schema
#[derive(Debug, Clone)]
pub struct AvroSchemaConversion {
    /// Parsed Avro schema
    pub schema: Schema,
    /// The same schema as Avro JSON
    pub schema_json: Value,
    /// Reverses the field renames applied during conversion
    pub name_updater: FieldNameUpdater,
}

/// Converts stream JSON schemas into Avro record schemas
pub struct JsonToAvroSchemaConverter;

impl JsonToAvroSchemaConverter {
    pub fn convert(
        stream_name: &str,
        namespace: Option<&str>,
        json_schema: &Value,
    ) -> Result<AvroSchemaConversion, AcceptanceError> {
        let record_name = AvroNameTransformer::convert_name(stream_name);
        let record_namespace = namespace.map(AvroNameTransformer::convert_namespace);

        let mut name_updater = FieldNameUpdater::new();
        let mut fields = vec![
            json!({ "name": AB_ID_FIELD, "type": { "type": "string", "logicalType": "uuid" } }),
            json!({ "name": EMITTED_AT_FIELD, "type": { "type": "long", "logicalType": "timestamp-millis" } }),
        ];
        let child_namespace = full_name(record_namespace.as_deref(), &record_name);
        fields.extend(Self::convert_properties(
            json_schema,
            &child_namespace,
            &mut name_updater,
        )?);
        fields.push(additional_properties_field());

        let schema_json = record_schema(&record_name, record_namespace.as_deref(), fields);
        let schema = Schema::parse(&schema_json)?;

        Ok(AvroSchemaConversion {
            schema,
            schema_json,
            name_updater,
        })
    }

    /// Only builds the name mapping, without a full schema
    pub fn field_name_updater(json_schema: &Value) -> Result<FieldNameUpdater, AcceptanceError> {
        let mut updater = FieldNameUpdater::new();
        Self::convert_properties(json_schema, "", &mut updater)?;
        Ok(updater)
    }

    fn convert_properties(
        json_schema: &Value,
        namespace: &str,
        updater: &mut FieldNameUpdater,
    ) -> Result<Vec<Value>, AcceptanceError> {
        let Some(properties) = json_schema.get("properties").and_then(Value::as_object) else {
            return Ok(Vec::new());
        };

        let mut seen: HashMap<String, &str> = HashMap::new();
        let mut fields = Vec::with_capacity(properties.len());

        for (original_name, property) in properties {
            let avro_name = AvroNameTransformer::convert_name(original_name);
            if let Some(previous) = seen.insert(avro_name.clone(), original_name) {
                return Err(AcceptanceError::Config(format!(
                    "fields '{}' and '{}' both map to Avro name '{}'",
                    previous, original_name, avro_name
                )));
            }
            updater.add_field(&avro_name, original_name);

            let field_type = Self::convert_type(property, &avro_name, namespace, updater)?;
            let mut field = Map::new();
            field.insert("name".to_string(), Value::String(avro_name.clone()));
            field.insert("type".to_string(), json!(["null", field_type]));
            field.insert("default".to_string(), Value::Null);
            if avro_name != *original_name {
                field.insert(
                    "doc".to_string(),
                    Value::String(format!("{}:{}", DOC_KEY_ORIGINAL_NAME, original_name)),
                );
            }
            fields.push(Value::Object(field));
        }

        Ok(fields)
    }

    fn convert_type(
        property: &Value,
        avro_name: &str,
        namespace: &str,
        updater: &mut FieldNameUpdater,
    ) -> Result<Value, AcceptanceError> {
        let converted = match json_type(property) {
            Some("string") => match property.get("format").and_then(Value::as_str) {
                Some("date") => json!({ "type": "int", "logicalType": "date" }),
                Some("date-time") => json!({ "type": "long", "logicalType": "timestamp-micros" }),
                Some("time") => json!({ "type": "long", "logicalType": "time-micros" }),
                _ => json!("string"),
            },
            Some("integer") => json!("long"),
            Some("number") => json!("double"),
            Some("boolean") => json!("boolean"),
            Some("object") if property.get("properties").is_some() => {
                let mut nested = FieldNameUpdater::new();
                let child_namespace = full_name(Some(namespace), avro_name);
                let mut fields = Self::convert_properties(property, &child_namespace, &mut nested)?;
                fields.push(additional_properties_field());
                updater.add_nested(avro_name, nested);
                let namespace = (!namespace.is_empty()).then_some(namespace);
                record_schema(avro_name, namespace, fields)
            }
            Some("array") => {
                let items = match property.get("items") {
                    Some(items) if items.is_object() => {
                        Self::convert_type(items, avro_name, namespace, updater)?
                    }
                    _ => json!("string"),
                };
                json!({ "type": "array", "items": ["null", items] })
            }
            _ => json!("string"),
        };
        Ok(converted)
    }
}

/// First non-null entry of a JSON schema `type`, which may be a list
fn json_type(property: &Value) -> Option<&str> {
    match property.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn full_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

fn record_schema(name: &str, namespace: Option<&str>, fields: Vec<Value>) -> Value {
    let mut record = Map::new();
    record.insert("type".to_string(), json!("record"));
    record.insert("name".to_string(), json!(name));
    if let Some(ns) = namespace {
        record.insert("namespace".to_string(), json!(ns));
    }
    record.insert("fields".to_string(), Value::Array(fields));
    Value::Object(record)
}

fn additional_properties_field() -> Value {
    json!({
        "name": ADDITIONAL_PROPERTIES_FIELD,
        "type": ["null", { "type": "map", "values": "string" }],
        "default": null
    })
}
