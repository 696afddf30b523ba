//! Avro Support
//!
//! Everything needed to read a destination's Avro output back as the JSON a
//! user originally sent:
//!
//! ```text
//! stream schema ─► JsonToAvroSchemaConverter ─► FieldNameUpdater
//!                                                     │
//! container bytes ─► Reader ─► avro_to_json ─► rename ┴─► prune ─► record
//! ```

pub mod convert;
pub mod name_updater;
pub mod names;
pub mod record_helper;
pub mod schema;

pub use convert::{avro_to_json, avro_to_json_bytes, json_to_avro};
pub use name_updater::FieldNameUpdater;
pub use names::{AvroNameTransformer, S3NameTransformer};
pub use record_helper::AvroRecordHelper;
pub use schema::{
    AvroSchemaConversion, JsonToAvroSchemaConverter, ADDITIONAL_PROPERTIES_FIELD, AB_ID_FIELD,
    DOC_KEY_ORIGINAL_NAME, EMITTED_AT_FIELD,
};
