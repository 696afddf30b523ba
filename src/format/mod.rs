//! Output Format Configuration
//!
//! The destination's `format` document selects how records are encoded. Only
//! the Avro branch is parsed in full; the other formats are recognised so a
//! misrouted document fails with a clear message.
//!
//! ```json
//! { "format_type": "Avro",
//!   "compression_codec": { "codec": "no compression", "compression_level": 5, "include_checksum": true } }
//! ```

use crate::error::AcceptanceError;
use apache_avro::Codec;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Output formats an S3 destination can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Format {
    Avro,
    Csv,
    Jsonl,
    Parquet,
}

impl S3Format {
    /// Value of `format_type` in the format document
    pub fn format_type(&self) -> &'static str {
        match self {
            S3Format::Avro => "Avro",
            S3Format::Csv => "CSV",
            S3Format::Jsonl => "JSONL",
            S3Format::Parquet => "Parquet",
        }
    }

    /// Extension of the objects written in this format
    pub fn file_extension(&self) -> &'static str {
        match self {
            S3Format::Avro => "avro",
            S3Format::Csv => "csv",
            S3Format::Jsonl => "jsonl",
            S3Format::Parquet => "parquet",
        }
    }
}

impl FromStr for S3Format {
    type Err = AcceptanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avro" => Ok(S3Format::Avro),
            "csv" => Ok(S3Format::Csv),
            "jsonl" => Ok(S3Format::Jsonl),
            "parquet" => Ok(S3Format::Parquet),
            _ => Err(AcceptanceError::Config(format!("unknown format_type '{}'", s))),
        }
    }
}

/// Avro block compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionCodec {
    NoCompression,
    Deflate { compression_level: u32 },
    Bzip2,
    Xz { compression_level: u32 },
    Zstandard { compression_level: i32, include_checksum: bool },
    Snappy,
}

impl CompressionCodec {
    /// Name of the matching `apache_avro::Codec`
    pub fn codec_name(&self) -> &'static str {
        match self {
            CompressionCodec::NoCompression => "null",
            CompressionCodec::Deflate { .. } => "deflate",
            CompressionCodec::Bzip2 => "bzip2",
            CompressionCodec::Xz { .. } => "xz",
            CompressionCodec::Zstandard { .. } => "zstandard",
            CompressionCodec::Snappy => "snappy",
        }
    }

    /// Codec to write container blocks with.
    ///
    /// Fails for codecs `apache-avro` was built without.
    pub fn avro_codec(&self) -> Result<Codec, AcceptanceError> {
        Codec::from_str(self.codec_name()).map_err(|_| {
            AcceptanceError::Config(format!(
                "codec '{}' is not available in this build",
                self.codec_name()
            ))
        })
    }
}

/// Raw shape of `compression_codec`; every codec accepts the same keys
#[derive(Debug, Deserialize)]
struct RawCompressionCodec {
    codec: String,
    compression_level: Option<i64>,
    include_checksum: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawFormatConfig {
    format_type: String,
    compression_codec: Option<RawCompressionCodec>,
}

/// Parsed Avro format document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvroFormatConfig {
    pub compression_codec: CompressionCodec,
}

impl AvroFormatConfig {
    pub fn from_json(config: &Value) -> Result<Self, AcceptanceError> {
        let raw: RawFormatConfig = serde_json::from_value(config.clone())?;
        let format: S3Format = raw.format_type.parse()?;
        if format != S3Format::Avro {
            return Err(AcceptanceError::Config(format!(
                "unsupported format '{}', expected Avro",
                raw.format_type
            )));
        }

        let compression_codec = match raw.compression_codec {
            Some(codec) => parse_codec(&codec)?,
            None => CompressionCodec::NoCompression,
        };
        Ok(AvroFormatConfig { compression_codec })
    }
}

fn parse_codec(raw: &RawCompressionCodec) -> Result<CompressionCodec, AcceptanceError> {
    let level = |default: i64, min: i64, max: i64| -> Result<i64, AcceptanceError> {
        let level = raw.compression_level.unwrap_or(default);
        if (min..=max).contains(&level) {
            Ok(level)
        } else {
            Err(AcceptanceError::Config(format!(
                "compression_level {} for codec '{}' is outside {}..={}",
                level, raw.codec, min, max
            )))
        }
    };

    // Levels only matter to the codecs that read them
    let codec = match raw.codec.to_ascii_lowercase().as_str() {
        "no compression" => CompressionCodec::NoCompression,
        "deflate" => CompressionCodec::Deflate {
            compression_level: level(0, 0, 9)? as u32,
        },
        "bzip2" => CompressionCodec::Bzip2,
        "xz" => CompressionCodec::Xz {
            compression_level: level(6, 0, 9)? as u32,
        },
        "zstandard" => CompressionCodec::Zstandard {
            compression_level: level(3, -5, 22)? as i32,
            include_checksum: raw.include_checksum.unwrap_or(false),
        },
        "snappy" => CompressionCodec::Snappy,
        other => {
            return Err(AcceptanceError::Config(format!(
                "unknown compression codec '{}'",
                other
            )))
        }
    };
    Ok(codec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_compression_ignores_level_and_checksum() {
        let config = AvroFormatConfig::from_json(&json!({
            "format_type": "Avro",
            "compression_codec": { "codec": "no compression", "compression_level": 5, "include_checksum": true }
        }))
        .unwrap();
        assert_eq!(config.compression_codec, CompressionCodec::NoCompression);
        assert_eq!(config.compression_codec.avro_codec().unwrap(), Codec::Null);
    }

    #[test]
    fn test_missing_codec_defaults_to_none() {
        let config = AvroFormatConfig::from_json(&json!({ "format_type": "avro" })).unwrap();
        assert_eq!(config.compression_codec, CompressionCodec::NoCompression);
    }

    #[test]
    fn test_codec_defaults_and_levels() {
        let parse = |codec: Value| {
            AvroFormatConfig::from_json(&json!({ "format_type": "Avro", "compression_codec": codec }))
                .map(|c| c.compression_codec)
        };

        assert_eq!(
            parse(json!({ "codec": "Deflate" })).unwrap(),
            CompressionCodec::Deflate { compression_level: 0 }
        );
        assert_eq!(
            parse(json!({ "codec": "xz" })).unwrap(),
            CompressionCodec::Xz { compression_level: 6 }
        );
        assert_eq!(
            parse(json!({ "codec": "zstandard", "compression_level": -3, "include_checksum": true })).unwrap(),
            CompressionCodec::Zstandard { compression_level: -3, include_checksum: true }
        );
        assert_eq!(parse(json!({ "codec": "snappy" })).unwrap(), CompressionCodec::Snappy);
        assert_eq!(parse(json!({ "codec": "bzip2" })).unwrap(), CompressionCodec::Bzip2);
    }

    #[test]
    fn test_out_of_range_level_rejected() {
        let err = AvroFormatConfig::from_json(&json!({
            "format_type": "Avro",
            "compression_codec": { "codec": "Deflate", "compression_level": 12 }
        }))
        .unwrap_err();
        assert!(matches!(err, AcceptanceError::Config(_)));
    }

    #[test]
    fn test_level_must_be_a_number() {
        let err = AvroFormatConfig::from_json(&json!({
            "format_type": "Avro",
            "compression_codec": { "codec": "no compression", "compression_level": "five" }
        }))
        .unwrap_err();
        assert!(matches!(err, AcceptanceError::Json(_)));
    }

    #[test]
    fn test_other_formats_rejected() {
        let err = AvroFormatConfig::from_json(&json!({ "format_type": "CSV" })).unwrap_err();
        assert!(matches!(err, AcceptanceError::Config(_)));

        let err = AvroFormatConfig::from_json(&json!({ "format_type": "ORC" })).unwrap_err();
        assert!(matches!(err, AcceptanceError::Config(_)));
    }

    #[test]
    fn test_unknown_codec_rejected() {
        let err = AvroFormatConfig::from_json(&json!({
            "format_type": "Avro",
            "compression_codec": { "codec": "lz4" }
        }))
        .unwrap_err();
        assert!(matches!(err, AcceptanceError::Config(_)));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(S3Format::Avro.format_type(), "Avro");
        assert_eq!(S3Format::Avro.file_extension(), "avro");
        assert_eq!("PARQUET".parse::<S3Format>().unwrap(), S3Format::Parquet);
    }
}
