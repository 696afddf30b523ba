//! Acceptance Test Errors
//!
//! Every failure in retrieval, decoding or comparison surfaces as an
//! `AcceptanceError`. Nothing is recovered locally: the error is handed back
//! to the test, which fails.

use serde_json::Value;
use std::io::Error as IoError;

/// Error type for acceptance test operations
#[derive(Debug)]
pub enum AcceptanceError {
    /// I/O error from the object store or filesystem
    Io(IoError),
    /// Avro container or schema error
    Avro(apache_avro::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Invalid or unsupported configuration
    Config(String),
    /// A value could not be converted between representations
    Conversion(String),
    /// Different number of records than expected
    RecordCountMismatch { expected: usize, actual: usize },
    /// A record has a different set of fields than expected
    FieldSetMismatch { expected: Vec<String>, actual: Vec<String> },
    /// A field value differs from the expected one
    ValueMismatch {
        key: String,
        expected: Value,
        actual: Value,
    },
    /// A record was expected to be a JSON object
    NotAnObject(Value),
}

impl std::fmt::Display for AcceptanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceptanceError::Io(e) => write!(f, "I/O error: {}", e),
            AcceptanceError::Avro(e) => write!(f, "Avro error: {}", e),
            AcceptanceError::Json(e) => write!(f, "JSON error: {}", e),
            AcceptanceError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AcceptanceError::Conversion(msg) => write!(f, "Conversion error: {}", msg),
            AcceptanceError::RecordCountMismatch { expected, actual } => {
                write!(f, "Record count mismatch: expected {}, got {}", expected, actual)
            }
            AcceptanceError::FieldSetMismatch { expected, actual } => {
                write!(
                    f,
                    "Field set mismatch: expected {:?}, got {:?}",
                    expected, actual
                )
            }
            AcceptanceError::ValueMismatch {
                key,
                expected,
                actual,
            } => write!(
                f,
                "Value mismatch for '{}': expected {}, got {}",
                key, expected, actual
            ),
            AcceptanceError::NotAnObject(value) => {
                write!(f, "Expected a JSON object, got {}", value)
            }
        }
    }
}

impl std::error::Error for AcceptanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcceptanceError::Io(e) => Some(e),
            AcceptanceError::Avro(e) => Some(e),
            AcceptanceError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for AcceptanceError {
    fn from(e: IoError) -> Self {
        AcceptanceError::Io(e)
    }
}

impl From<apache_avro::Error> for AcceptanceError {
    fn from(e: apache_avro::Error) -> Self {
        AcceptanceError::Avro(e)
    }
}

impl From<serde_json::Error> for AcceptanceError {
    fn from(e: serde_json::Error) -> Self {
        AcceptanceError::Json(e)
    }
}
