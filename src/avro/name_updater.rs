//! Restores original JSON field names on records decoded from Avro.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Maps sanitized Avro field names back to the names in the stream schema.
///
/// One level per record: nested records (including records inside arrays)
/// carry their own updater, keyed by the Avro name of the field holding them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldNameUpdater {
    original_names: HashMap<String, String>,
    nested: HashMap<String, FieldNameUpdater>,
}

impl FieldNameUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `avro_name` was derived from `original_name`
    pub fn add_field(&mut self, avro_name: &str, original_name: &str) {
        if avro_name != original_name {
            self.original_names
                .insert(avro_name.to_string(), original_name.to_string());
        }
    }

    /// Attach the updater for the record stored under `avro_name`
    pub fn add_nested(&mut self, avro_name: &str, updater: FieldNameUpdater) {
        self.nested.insert(avro_name.to_string(), updater);
    }

    /// Original name for an Avro field; unchanged names map to themselves
    pub fn original_name<'a>(&'a self, avro_name: &'a str) -> &'a str {
        self.original_names
            .get(avro_name)
            .map(String::as_str)
            .unwrap_or(avro_name)
    }

    /// Updater for the nested record stored under `avro_name`
    pub fn nested(&self, avro_name: &str) -> Option<&FieldNameUpdater> {
        self.nested.get(avro_name)
    }

    /// True if any field at any depth was renamed
    pub fn has_renames(&self) -> bool {
        !self.original_names.is_empty() || self.nested.values().any(FieldNameUpdater::has_renames)
    }

    /// Rename every key in `input` back to its original field name
    pub fn get_json_with_original_field_names(&self, input: Value) -> Value {
        match input {
            Value::Object(fields) => {
                let mut output = Map::with_capacity(fields.len());
                for (key, value) in fields {
                    let value = match self.nested(&key) {
                        Some(updater) => updater.get_json_with_original_field_names(value),
                        None => value,
                    };
                    output.insert(self.original_name(&key).to_string(), value);
                }
                Value::Object(output)
            }
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.get_json_with_original_field_names(item))
                    .collect(),
            ),
            other => other,
        }
    }
}
