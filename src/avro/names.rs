//! Avro-safe names.
//!
//! Avro names must match `[A-Za-z_][A-Za-z0-9_]*`. JSON field names and stream
//! names are free-form, so they are normalized before they reach a schema and
//! restored afterwards by [`FieldNameUpdater`](super::FieldNameUpdater).

/// Converts arbitrary names into Avro identifiers
pub struct AvroNameTransformer;

impl AvroNameTransformer {
    /// Replace every char outside `[A-Za-z0-9_]` with `_` and make sure the
    /// result does not start with a digit.
    pub fn convert_name(input: &str) -> String {
        let mut name = to_alphanumeric_and_underscore(input);
        if name.is_empty() {
            return "_".to_string();
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert(0, '_');
        }
        name
    }

    /// Namespaces are dotted sequences of names
    pub fn convert_namespace(input: &str) -> String {
        input
            .split('.')
            .map(Self::convert_name)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Key-safe path segments for S3 output prefixes
pub struct S3NameTransformer;

impl S3NameTransformer {
    pub fn convert_stream_name(input: &str) -> String {
        to_alphanumeric_and_underscore(input)
    }
}

fn to_alphanumeric_and_underscore(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
