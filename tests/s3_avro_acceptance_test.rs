//! S3 Avro Acceptance Tests
//!
//! End-to-end checks of the read side: records are written the way the
//! destination lays them out, then retrieved and compared through the
//! harness.

use s3_avro_acceptance::store::{InMemoryObjectStore, ObjectStore};
use s3_avro_acceptance::{
    build_store, init_logging, AcceptanceError, DestinationAcceptanceTest, LogConfig,
    S3AvroDestinationAcceptanceTest, S3DestinationConfig, StoreConfig, SyncedStreamWriter,
    TestDestinationEnv,
};
use serde_json::{json, Value};
use std::sync::Arc;

// =============================================================================
// Fixtures
// =============================================================================

fn destination_config() -> S3DestinationConfig {
    S3DestinationConfig::from_json(&json!({
        "s3_bucket_name": "acceptance-bucket",
        "s3_bucket_path": "integration_test",
        "s3_bucket_region": "us-west-2"
    }))
    .unwrap()
}

fn users_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer" },
            "user name": { "type": ["null", "string"] },
            "score": { "type": "number" },
            "active": { "type": "boolean" },
            "date": { "type": "string", "format": "date" },
            "home address": {
                "type": "object",
                "properties": {
                    "zip-code": { "type": "string" },
                    "city": { "type": "string" }
                }
            },
            "past addresses": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "zip-code": { "type": "string" } }
                }
            },
            "tags": { "type": "array", "items": { "type": "string" } }
        }
    })
}

fn users() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "user name": "alice",
            "score": 9.5,
            "active": true,
            "date": "2021-01-01",
            "home address": { "zip-code": "94107", "city": "San Francisco" },
            "past addresses": [ { "zip-code": "10001" }, { "zip-code": "60601" } ],
            "tags": ["admin", "beta"]
        }),
        json!({
            "id": 2,
            "user name": "bob",
            "date": "1969-12-31",
            "home address": { "zip-code": "02139" }
        }),
        json!({ "id": 3 }),
    ]
}

/// Harness plus a writer for one stream, sharing a store
fn setup(
    store: Arc<dyn ObjectStore>,
    stream: &str,
    namespace: Option<&str>,
) -> (S3AvroDestinationAcceptanceTest, SyncedStreamWriter) {
    init_logging(&LogConfig::from_env());

    let mut harness = S3AvroDestinationAcceptanceTest::new(destination_config(), store.clone());
    harness.setup();
    let writer = SyncedStreamWriter::new(
        store,
        harness.base().output_prefix(namespace, stream),
        stream,
        namespace,
        &users_schema(),
        &harness.format_config(),
    )
    .unwrap();
    (harness, writer)
}

fn env() -> TestDestinationEnv {
    TestDestinationEnv::new(std::env::temp_dir())
}

// =============================================================================
// Round Trip
// =============================================================================

#[tokio::test]
async fn test_round_trip_in_memory() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new("acceptance-bucket"));
    let (harness, mut writer) = setup(store, "users", Some("public"));

    writer.write_part(&users()).await.unwrap();

    harness
        .retrieve_and_verify(&env(), "users", Some("public"), &users_schema(), &users())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_round_trip_local_fs() {
    let dir = tempfile::tempdir().unwrap();
    let store = build_store(&StoreConfig::local(dir.path().to_path_buf(), "acceptance-bucket")).unwrap();
    let (harness, mut writer) = setup(store, "users", None);

    writer.write_part(&users()).await.unwrap();

    harness
        .retrieve_and_verify(&env(), "users", None, &users_schema(), &users())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_original_field_names_restored() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new("acceptance-bucket"));
    let (harness, mut writer) = setup(store, "users", None);
    writer.write_part(&users()[..1]).await.unwrap();

    let records = harness
        .retrieve_records(&env(), "users", None, &users_schema())
        .await
        .unwrap();

    let record = records[0].as_object().unwrap();
    assert!(record.contains_key("user name"));
    assert!(!record.contains_key("user_name"));
    assert_eq!(records[0]["home address"]["zip-code"], "94107");
    assert_eq!(records[0]["past addresses"][1]["zip-code"], "60601");
    // Dates come back as epoch days
    assert_eq!(records[0]["date"], 18628);
}

#[tokio::test]
async fn test_bookkeeping_fields_pruned() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new("acceptance-bucket"));
    let (harness, mut writer) = setup(store, "users", None);
    writer.write_part(&users()[2..]).await.unwrap();

    let records = harness
        .retrieve_records(&env(), "users", None, &users_schema())
        .await
        .unwrap();

    assert_eq!(records, vec![json!({ "id": 3 })]);
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn test_order_follows_upload_time_across_objects() {
    let memory = InMemoryObjectStore::new("acceptance-bucket");
    let store: Arc<dyn ObjectStore> = Arc::new(memory.clone());
    let (harness, mut writer) = setup(store, "users", None);
    let records = users();

    let first = writer.write_part(&records[..2]).await.unwrap();
    let second = writer.write_part(&records[2..]).await.unwrap();
    // Upload order is the reverse of key order
    memory.set_last_modified(&first, 2_000).unwrap();
    memory.set_last_modified(&second, 1_000).unwrap();

    let actual = harness
        .retrieve_records(&env(), "users", None, &users_schema())
        .await
        .unwrap();

    let expected = vec![records[2].clone(), records[0].clone(), records[1].clone()];
    harness.assert_same_messages(&expected, &actual).unwrap();
}

#[tokio::test]
async fn test_other_streams_ignored() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new("acceptance-bucket"));
    let (harness, mut users_writer) = setup(store.clone(), "users", None);
    users_writer.write_part(&users()).await.unwrap();

    let mut archive_writer = SyncedStreamWriter::new(
        store,
        harness.base().output_prefix(None, "users_archive"),
        "users_archive",
        None,
        &users_schema(),
        &harness.format_config(),
    )
    .unwrap();
    archive_writer.write_part(&users()).await.unwrap();

    let actual = harness
        .retrieve_records(&env(), "users", None, &users_schema())
        .await
        .unwrap();
    assert_eq!(actual.len(), users().len());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_mismatched_records_fail() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new("acceptance-bucket"));
    let (harness, mut writer) = setup(store, "users", None);
    writer.write_part(&users()).await.unwrap();

    let mut expected = users();
    expected[1]["user name"] = json!("carol");

    let err = harness
        .retrieve_and_verify(&env(), "users", None, &users_schema(), &expected)
        .await
        .unwrap_err();
    assert!(matches!(err, AcceptanceError::ValueMismatch { ref key, .. } if key == "user name"));
}

#[tokio::test]
async fn test_wrong_date_fails() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new("acceptance-bucket"));
    let (harness, mut writer) = setup(store, "users", None);
    writer.write_part(&users()).await.unwrap();

    let mut expected = users();
    expected[0]["date"] = json!("2021-01-02");

    let err = harness
        .retrieve_and_verify(&env(), "users", None, &users_schema(), &expected)
        .await
        .unwrap_err();
    assert!(matches!(err, AcceptanceError::ValueMismatch { ref key, .. } if key == "date"));
}

#[tokio::test]
async fn test_corrupt_object_fails_whole_retrieval() {
    let memory = InMemoryObjectStore::new("acceptance-bucket");
    let store: Arc<dyn ObjectStore> = Arc::new(memory.clone());
    let (harness, mut writer) = setup(store, "users", None);

    let good = writer.write_part(&users()).await.unwrap();
    let bad = format!("{}/2099_01_01_0_9.avro", harness.base().output_prefix(None, "users"));
    memory.put(&bad, b"Obj\x01 truncated").await.unwrap();
    memory.set_last_modified(&good, 1).unwrap();
    memory.set_last_modified(&bad, 2).unwrap();

    let result = harness
        .retrieve_records(&env(), "users", None, &users_schema())
        .await;
    assert!(result.is_err());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_tear_down_removes_run_objects() {
    let memory = InMemoryObjectStore::new("acceptance-bucket");
    let store: Arc<dyn ObjectStore> = Arc::new(memory.clone());
    memory.put("unrelated/keep.avro", b"x").await.unwrap();

    let (harness, mut writer) = setup(store, "users", Some("public"));
    writer.write_part(&users()).await.unwrap();
    writer.write_part(&users()).await.unwrap();

    assert_eq!(harness.tear_down().await.unwrap(), 2);
    assert_eq!(memory.len(), 1);

    let records = harness
        .retrieve_records(&env(), "users", Some("public"), &users_schema())
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_runs_are_isolated() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new("acceptance-bucket"));
    let (first, mut first_writer) = setup(store.clone(), "users", None);
    let (second, _) = setup(store, "users", None);

    first_writer.write_part(&users()).await.unwrap();

    assert_ne!(
        first.base().destination_config().bucket_path,
        second.base().destination_config().bucket_path
    );
    let records = second
        .retrieve_records(&env(), "users", None, &users_schema())
        .await
        .unwrap();
    assert!(records.is_empty());
}

// =============================================================================
// Live S3
// =============================================================================

/// Needs credentials in `$S3_DESTINATION_CONFIG` (or `secrets/config.json`)
#[cfg(feature = "s3")]
#[tokio::test]
#[ignore]
async fn test_round_trip_live_s3() {
    let config = S3DestinationConfig::from_env().unwrap();
    let store = build_store(&StoreConfig::s3(config.s3_config())).unwrap();

    let mut harness = S3AvroDestinationAcceptanceTest::new(config, store.clone());
    harness.setup();
    let mut writer = SyncedStreamWriter::new(
        store,
        harness.base().output_prefix(Some("public"), "users"),
        "users",
        Some("public"),
        &users_schema(),
        &harness.format_config(),
    )
    .unwrap();
    writer.write_part(&users()).await.unwrap();

    let result = harness
        .retrieve_and_verify(&env(), "users", Some("public"), &users_schema(), &users())
        .await;
    harness.tear_down().await.unwrap();
    result.unwrap();
}
