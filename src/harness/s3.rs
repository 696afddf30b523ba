//! S3 Destination Test Base
//!
//! Shared by every S3 output format: owns the destination config and the
//! bucket client, knows where a sync puts each stream's objects, and cleans
//! the bucket path up afterwards.
//!
//! ## Object Layout
//!
//! ```text
//! <bucket_path>/<namespace>/<stream>/<yyyy_MM_dd>_<epoch_ms>_<part>.<ext>
//! ```

use crate::avro::S3NameTransformer;
use crate::error::AcceptanceError;
use crate::format::S3Format;
use crate::store::{ObjectStore, ObjectSummary, S3Config};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Env var naming the destination config file
pub const CONFIG_PATH_ENV: &str = "S3_DESTINATION_CONFIG";
/// Config file used when the env var is unset
pub const DEFAULT_CONFIG_PATH: &str = "secrets/config.json";

/// Destination connector config, as stored in the secrets file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3DestinationConfig {
    #[serde(rename = "s3_bucket_name")]
    pub bucket_name: String,
    #[serde(rename = "s3_bucket_path")]
    pub bucket_path: String,
    #[serde(rename = "s3_bucket_region", default)]
    pub bucket_region: String,
    #[serde(rename = "s3_endpoint", default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
}

impl S3DestinationConfig {
    pub fn from_json(config: &Value) -> Result<Self, AcceptanceError> {
        Ok(serde_json::from_value(config.clone())?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AcceptanceError> {
        let contents = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Load from `$S3_DESTINATION_CONFIG`, or `secrets/config.json`
    pub fn from_env() -> Result<Self, AcceptanceError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(path)
    }

    /// Connection settings for the bucket client
    pub fn s3_config(&self) -> S3Config {
        S3Config {
            bucket: self.bucket_name.clone(),
            region: self.bucket_region.clone(),
            endpoint: self.endpoint.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }
}

/// Format-independent half of an S3 destination acceptance test
pub struct S3DestinationTestBase {
    output_format: S3Format,
    config: S3DestinationConfig,
    store: Arc<dyn ObjectStore>,
}

impl S3DestinationTestBase {
    pub fn new(output_format: S3Format, config: S3DestinationConfig, store: Arc<dyn ObjectStore>) -> Self {
        S3DestinationTestBase {
            output_format,
            config,
            store,
        }
    }

    /// Isolate this run under a fresh bucket path
    pub fn setup(&mut self) {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(5)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        let base = self.config.bucket_path.trim_end_matches('/');
        self.config.bucket_path = if base.is_empty() {
            format!("test_{}", suffix)
        } else {
            format!("{}_{}", base, suffix)
        };
        info!(
            bucket = %self.config.bucket_name,
            path = %self.config.bucket_path,
            format = self.output_format.format_type(),
            "Test bucket path"
        );
    }

    pub fn output_format(&self) -> S3Format {
        self.output_format
    }

    pub fn destination_config(&self) -> &S3DestinationConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Destination config JSON with `format_config` under `format`
    pub fn config(&self, format_config: Value) -> Result<Value, AcceptanceError> {
        let mut config = self.config.clone();
        config.format = Some(format_config);
        Ok(serde_json::to_value(config)?)
    }

    /// Same as `config`, with credentials that must fail a connection check
    pub fn fail_check_config(&self, format_config: Value) -> Result<Value, AcceptanceError> {
        let mut config = self.config.clone();
        config.access_key_id = Some("fake-key".to_string());
        config.secret_access_key = Some("fake-secret".to_string());
        config.format = Some(format_config);
        Ok(serde_json::to_value(config)?)
    }

    /// Key prefix a sync writes a stream's objects under
    pub fn output_prefix(&self, namespace: Option<&str>, stream_name: &str) -> String {
        let mut parts = Vec::with_capacity(3);
        let bucket_path = self.config.bucket_path.trim_end_matches('/');
        if !bucket_path.is_empty() {
            parts.push(bucket_path.to_string());
        }
        if let Some(ns) = namespace {
            parts.push(S3NameTransformer::convert_stream_name(ns));
        }
        parts.push(S3NameTransformer::convert_stream_name(stream_name));
        parts.join("/")
    }

    /// All objects the sync produced for a stream, oldest first
    pub async fn get_all_synced_objects(
        &self,
        stream_name: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, AcceptanceError> {
        let prefix = self.output_prefix(namespace, stream_name);
        let stream_dir = format!("{}/", S3NameTransformer::convert_stream_name(stream_name));

        let mut objects = self.list_all(&prefix).await?;
        objects.retain(|o| o.key.contains(&stream_dir));
        objects.sort_by(|a, b| {
            a.last_modified_ms
                .cmp(&b.last_modified_ms)
                .then_with(|| a.key.cmp(&b.key))
        });

        debug!(
            stream = stream_name,
            prefix = %prefix,
            count = objects.len(),
            "Listed synced objects"
        );
        Ok(objects)
    }

    /// Delete everything under the bucket path; returns the number removed
    pub async fn tear_down(&self) -> Result<usize, AcceptanceError> {
        let prefix = format!("{}/", self.config.bucket_path.trim_end_matches('/'));
        let objects = self.list_all(&prefix).await?;
        for object in &objects {
            self.store.delete(&object.key).await?;
        }
        info!(
            bucket = %self.config.bucket_name,
            prefix = %prefix,
            deleted = objects.len(),
            "Cleaned up test objects"
        );
        Ok(objects.len())
    }

    async fn list_all(&self, prefix: &str) -> Result<Vec<ObjectSummary>, AcceptanceError> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.store.list(prefix, token.as_deref()).await?;
            objects.extend(page.objects);
            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(objects)
    }
}
