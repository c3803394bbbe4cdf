//! Error handling and edge case tests.

use serde_json::json;
use std::sync::Arc;
use swiftdb::{
    AuthFailure, AuthOutcome, Database, DatabaseConfig, EmbeddedSource, FileStorage,
    KeyValueStorage, MemoryStorage, NewSale, Record, SaveOutcome, Schema, StoreError,
};
use tempfile::TempDir;

fn db_with(source: EmbeddedSource, storage: Arc<dyn KeyValueStorage>) -> Database {
    Database::with_parts(Schema::default(), Box::new(source), storage)
}

fn fields(value: serde_json::Value) -> Record {
    value.as_object().unwrap().clone()
}

// --- Load Errors ---

#[test]
fn test_unknown_collection() {
    let db = Database::in_memory();

    assert!(matches!(db.find_all("orders"), Err(StoreError::UnknownCollection(_))));
    assert!(matches!(
        db.create("orders", Record::new()),
        Err(StoreError::UnknownCollection(_))
    ));
    assert!(matches!(
        db.reset_to_original_data(Some("orders")),
        Err(StoreError::UnknownCollection(_))
    ));
}

#[test]
fn test_missing_bundled_document_is_load_error() {
    let db = db_with(EmbeddedSource::empty(), Arc::new(MemoryStorage::new()));

    let result = db.find_all("stores");
    assert!(matches!(result, Err(StoreError::Load { ref collection, .. }) if collection == "stores"));
}

#[test]
fn test_malformed_bundled_document_is_load_error() {
    let source = EmbeddedSource::empty().with_document("stores.json", "{\"stores\": [");
    let db = db_with(source, Arc::new(MemoryStorage::new()));

    assert!(matches!(db.find_by_id("stores", 1u64), Err(StoreError::Load { .. })));
}

#[test]
fn test_failed_load_can_be_retried() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();

    let db = Database::open(DatabaseConfig {
        data_path: Some(data.clone()),
        ..Default::default()
    })
    .unwrap();

    assert!(db.find_all("stores").is_err());

    std::fs::write(data.join("stores.json"), r#"{"stores":[{"id":1}]}"#).unwrap();
    assert_eq!(db.find_all("stores").unwrap().len(), 1);
}

#[test]
fn test_corrupt_override_falls_back_to_bundled() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("swift_db_users", "definitely not json").unwrap();
    let db = db_with(EmbeddedSource::default(), storage);

    assert_eq!(db.find_all("users").unwrap().len(), 5);
}

// --- Format Errors ---

#[test]
fn test_records_field_not_an_array() {
    let source = EmbeddedSource::empty().with_document("stores.json", r#"{"stores": {"id": 1}}"#);
    let db = db_with(source, Arc::new(MemoryStorage::new()));

    assert!(matches!(db.find_all("stores"), Err(StoreError::InvalidFormat(_))));
    assert!(matches!(
        db.create("stores", Record::new()),
        Err(StoreError::InvalidFormat(_))
    ));
}

#[test]
fn test_missing_records_field_reads_empty_and_accepts_create() {
    let source = EmbeddedSource::empty().with_document("stores.json", "{}");
    let db = db_with(source, Arc::new(MemoryStorage::new()));

    assert!(db.find_all("stores").unwrap().is_empty());
    assert!(db.find_by_id("stores", 1u64).unwrap().is_not_found());

    let created = db.create("stores", fields(json!({"name": "A"}))).unwrap();
    assert_eq!(created["id"], 1);
    assert_eq!(db.load("stores").unwrap()["stores"][0]["name"], "A");
}

#[test]
fn test_non_object_record_is_invalid_format() {
    let source = EmbeddedSource::empty().with_document("stores.json", r#"{"stores": [1, 2]}"#);
    let db = db_with(source, Arc::new(MemoryStorage::new()));

    assert!(matches!(db.find_all("stores"), Err(StoreError::InvalidFormat(_))));
}

#[test]
fn test_records_without_integer_ids_are_skipped_for_next_id() {
    let source = EmbeddedSource::empty()
        .with_document("stores.json", r#"{"stores": [{"id": "7"}, {"name": "no id"}, {"id": 2}]}"#);
    let db = db_with(source, Arc::new(MemoryStorage::new()));

    let created = db.create("stores", Record::new()).unwrap();
    assert_eq!(created["id"], 3);
}

#[test]
fn test_create_after_largest_possible_id() {
    let source = EmbeddedSource::empty()
        .with_document("stores.json", r#"{"stores": [{"id": 18446744073709551615}]}"#);
    let db = db_with(source, Arc::new(MemoryStorage::new()));

    assert!(matches!(
        db.create("stores", Record::new()),
        Err(StoreError::InvalidRecord(_))
    ));
    assert_eq!(db.find_all("stores").unwrap().len(), 1);
    assert!(db.modified_collections().unwrap().is_empty());
}

// --- Persist Errors ---

#[test]
fn test_quota_exceeded_keeps_in_memory_state() {
    let storage = Arc::new(MemoryStorage::with_quota(64));
    let db = db_with(EmbeddedSource::default(), storage.clone());

    let created = db
        .create("stores", fields(json!({"name": "Quota buster"})))
        .unwrap();

    // Nothing reached the override storage, but the session keeps the record.
    assert!(storage.get("swift_db_stores").unwrap().is_none());
    assert!(db.find_by_id("stores", created["id"].as_u64().unwrap()).unwrap().is_found());
    assert!(db.modified_collections().unwrap().is_empty());

    // Once evicted, the unpersisted change is gone.
    db.clear_cache();
    assert_eq!(db.find_all("stores").unwrap().len(), 2);
}

#[test]
fn test_save_reports_cache_only() {
    let db = Database::open(DatabaseConfig {
        quota_bytes: Some(8),
        ..Default::default()
    })
    .unwrap();

    let outcome = db
        .collections()
        .save("stores", json!({"stores": []}))
        .unwrap();
    assert!(matches!(outcome, SaveOutcome::CacheOnly(reason) if reason.contains("quota")));
}

#[test]
fn test_storage_locked_by_another_database() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        storage_path: Some(dir.path().join("local")),
        ..Default::default()
    };

    let _first = Database::open(config.clone()).unwrap();
    let second = Database::open(config);
    assert!(matches!(second, Err(StoreError::Locked)));
}

// --- Domain Errors ---

#[test]
fn test_authenticate_with_unloadable_users_is_internal_failure() {
    let db = db_with(EmbeddedSource::empty(), Arc::new(MemoryStorage::new()));

    let outcome = db.authenticate_user("gerente@swift.com", "123456");
    assert!(matches!(outcome, AuthOutcome::Failure(AuthFailure::Internal(_))));
    if let AuthOutcome::Failure(failure) = outcome {
        assert_eq!(failure.message(), "Internal server error");
    }
}

#[test]
fn test_sale_too_large_to_score_is_rejected() {
    let db = Database::in_memory();

    let result = db.register_sale(NewSale::new(2, 1e20, false));
    assert!(matches!(result, Err(StoreError::InvalidRecord(_))));

    assert_eq!(db.find_all("sales").unwrap().len(), 2);
    assert_eq!(
        db.get_user_ranking(2).unwrap().unwrap().ranking.current_points,
        1280
    );
}

#[test]
fn test_sale_persists_when_point_update_fails() {
    // Sales load fine but the rankings document is broken.
    let source = EmbeddedSource::empty()
        .with_document("sales.json", r#"{"sales": []}"#)
        .with_document("rankings.json", r#"{"rankings": {"levels": 7}}"#);
    let db = db_with(source, Arc::new(MemoryStorage::new()));

    let result = db.register_sale(NewSale::new(2, 40.0, false));
    assert!(matches!(result, Err(StoreError::Deserialization(_))));

    let sales = db.find_all("sales").unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0]["points_earned"], 4);
}

#[test]
fn test_config_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("swiftdb.json");
    std::fs::write(&path, r#"{"quota_bytes": 1024, "key_prefix": "demo_"}"#).unwrap();

    let config = DatabaseConfig::from_json_file(&path).unwrap();
    assert_eq!(config.quota_bytes, Some(1024));
    assert_eq!(config.key_prefix, "demo_");
    assert!(config.storage_path.is_none());

    std::fs::write(&path, "{").unwrap();
    assert!(matches!(
        DatabaseConfig::from_json_file(&path),
        Err(StoreError::Deserialization(_))
    ));
}

#[test]
fn test_key_prefix_applies_to_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("local");

    {
        let db = Database::open(DatabaseConfig {
            storage_path: Some(path.clone()),
            key_prefix: "demo_".into(),
            ..Default::default()
        })
        .unwrap();
        db.remove("stores", 2u64).unwrap();
    }

    let storage = FileStorage::open(&path).unwrap();
    assert_eq!(storage.keys().unwrap(), vec!["demo_stores"]);
}
