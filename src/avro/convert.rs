//! Avro ⇄ JSON value conversion

use super::name_updater::FieldNameUpdater;
use crate::error::AcceptanceError;
use crate::harness::date::{epoch_day, parse_calendar_date};
use apache_avro::types::Value as AvroValue;
use apache_avro::Schema;
use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

// ============================================================================
// Avro → JSON
// ============================================================================

/// Convert a decoded Avro value to JSON.
///
/// Logical types come out in their Avro storage form: dates as epoch days,
/// times and timestamps as integers. Unions collapse to their inner value.
pub fn avro_to_json(value: &AvroValue) -> Result<Value, AcceptanceError> {
    let converted = match value {
        AvroValue::Null => Value::Null,
        AvroValue::Boolean(b) => Value::Bool(*b),
        AvroValue::Int(i) => Value::from(*i),
        AvroValue::Long(l) => Value::from(*l),
        AvroValue::Float(f) => float_to_json(f64::from(*f))?,
        AvroValue::Double(d) => float_to_json(*d)?,
        AvroValue::String(s) | AvroValue::Enum(_, s) => Value::String(s.clone()),
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => {
            Value::Array(b.iter().map(|byte| Value::from(*byte)).collect())
        }
        AvroValue::Union(_, inner) => avro_to_json(inner)?,
        AvroValue::Array(items) => Value::Array(
            items
                .iter()
                .map(avro_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AvroValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(k.clone(), avro_to_json(v)?);
            }
            Value::Object(map)
        }
        AvroValue::Record(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (k, v) in fields {
                map.insert(k.clone(), avro_to_json(v)?);
            }
            Value::Object(map)
        }
        AvroValue::Date(days) => Value::from(*days),
        AvroValue::TimeMillis(t) => Value::from(*t),
        AvroValue::TimeMicros(t) => Value::from(*t),
        AvroValue::TimestampMillis(t)
        | AvroValue::TimestampMicros(t)
        | AvroValue::LocalTimestampMillis(t)
        | AvroValue::LocalTimestampMicros(t) => Value::from(*t),
        AvroValue::Uuid(u) => Value::String(u.to_string()),
        other => {
            return Err(AcceptanceError::Conversion(format!(
                "unsupported Avro value: {:?}",
                other
            )))
        }
    };
    Ok(converted)
}

/// Serialize a decoded Avro value as JSON bytes
pub fn avro_to_json_bytes(value: &AvroValue) -> Result<Vec<u8>, AcceptanceError> {
    Ok(serde_json::to_vec(&avro_to_json(value)?)?)
}

fn float_to_json(f: f64) -> Result<Value, AcceptanceError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| AcceptanceError::Conversion(format!("non-finite float {} has no JSON form", f)))
}

// ============================================================================
// JSON → Avro
// ============================================================================

/// Convert a JSON value to an Avro value of the given schema.
///
/// Record fields are looked up in `value` under their original names via
/// `updater`; absent fields become null.
pub fn json_to_avro(
    value: &Value,
    schema: &Schema,
    updater: &FieldNameUpdater,
) -> Result<AvroValue, AcceptanceError> {
    let converted = match (value, schema) {
        (_, Schema::Union(union_schema)) => {
            let variants = union_schema.variants();
            if value.is_null() {
                let idx = variants
                    .iter()
                    .position(|v| matches!(v, Schema::Null))
                    .ok_or_else(|| mismatch(value, schema))?;
                return Ok(AvroValue::Union(idx as u32, Box::new(AvroValue::Null)));
            }
            for (idx, variant) in variants.iter().enumerate() {
                if matches!(variant, Schema::Null) {
                    continue;
                }
                if let Ok(v) = json_to_avro(value, variant, updater) {
                    return Ok(AvroValue::Union(idx as u32, Box::new(v)));
                }
            }
            return Err(mismatch(value, schema));
        }
        (Value::Null, Schema::Null) => AvroValue::Null,
        (Value::Bool(b), Schema::Boolean) => AvroValue::Boolean(*b),
        (Value::Number(n), Schema::Int) => {
            let i = n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| mismatch(value, schema))?;
            AvroValue::Int(i)
        }
        (Value::Number(n), Schema::Long) => {
            AvroValue::Long(n.as_i64().ok_or_else(|| mismatch(value, schema))?)
        }
        (Value::Number(n), Schema::Float) => {
            AvroValue::Float(n.as_f64().ok_or_else(|| mismatch(value, schema))? as f32)
        }
        (Value::Number(n), Schema::Double) => {
            AvroValue::Double(n.as_f64().ok_or_else(|| mismatch(value, schema))?)
        }
        (Value::String(s), Schema::String) => AvroValue::String(s.clone()),
        (Value::String(s), Schema::Date) => {
            let date = parse_calendar_date(s).ok_or_else(|| mismatch(value, schema))?;
            AvroValue::Date(epoch_day(date))
        }
        (Value::Number(n), Schema::Date) => {
            let days = n
                .as_i64()
                .and_then(|d| i32::try_from(d).ok())
                .ok_or_else(|| mismatch(value, schema))?;
            AvroValue::Date(days)
        }
        (Value::String(s), Schema::TimestampMicros) => {
            AvroValue::TimestampMicros(parse_timestamp_micros(s).ok_or_else(|| mismatch(value, schema))?)
        }
        (Value::Number(n), Schema::TimestampMicros) => {
            AvroValue::TimestampMicros(n.as_i64().ok_or_else(|| mismatch(value, schema))?)
        }
        (Value::Number(n), Schema::TimestampMillis) => {
            AvroValue::TimestampMillis(n.as_i64().ok_or_else(|| mismatch(value, schema))?)
        }
        (Value::String(s), Schema::TimeMicros) => {
            let time = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map_err(|_| mismatch(value, schema))?;
            let micros = i64::from(time.num_seconds_from_midnight()) * 1_000_000
                + i64::from(time.nanosecond() / 1_000);
            AvroValue::TimeMicros(micros)
        }
        (Value::String(s), Schema::Uuid) => {
            AvroValue::Uuid(uuid::Uuid::parse_str(s).map_err(|_| mismatch(value, schema))?)
        }
        (Value::Array(items), Schema::Array(array_schema)) => AvroValue::Array(
            items
                .iter()
                .map(|item| json_to_avro(item, &array_schema.items, updater))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        (Value::Object(entries), Schema::Map(map_schema)) => {
            let mut map = HashMap::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(k.clone(), json_to_avro(v, &map_schema.types, updater)?);
            }
            AvroValue::Map(map)
        }
        (Value::Object(entries), Schema::Record(record_schema)) => {
            let empty = FieldNameUpdater::new();
            let mut fields = Vec::with_capacity(record_schema.fields.len());
            for field in &record_schema.fields {
                let original = updater.original_name(&field.name);
                let nested = updater.nested(&field.name).unwrap_or(&empty);
                let field_value = entries.get(original).unwrap_or(&Value::Null);
                fields.push((
                    field.name.clone(),
                    json_to_avro(field_value, &field.schema, nested)?,
                ));
            }
            AvroValue::Record(fields)
        }
        _ => return Err(mismatch(value, schema)),
    };
    Ok(converted)
}

fn parse_timestamp_micros(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_micros());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp_micros())
}

fn mismatch(value: &Value, schema: &Schema) -> AcceptanceError {
    AcceptanceError::Conversion(format!(
        "cannot convert {} to Avro {}",
        value,
        schema.canonical_form()
    ))
}
