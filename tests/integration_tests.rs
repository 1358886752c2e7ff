//! Integration tests for the QR app storage helpers

use qr_app_storage::prelude::*;
use qr_app_storage::storage::{EngineFault, StorageFactory};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScannedImage {
    id: String,
    width: u32,
    height: u32,
    data_url: String,
}

fn sample_image() -> ScannedImage {
    ScannedImage {
        id: "img-1".to_string(),
        width: 256,
        height: 256,
        data_url: "data:image/png;base64,iVBORw0KGgo=".to_string(),
    }
}

#[test]
fn test_library_version() {
    assert!(!qr_app_storage::VERSION.is_empty());
    assert_eq!(qr_app_storage::CRATE_NAME, "qr-app-storage");
}

#[tokio::test]
async fn test_idb_scenario() {
    let store = StorageFactory::create_memory_idb();

    store.set("a", &json!({ "n": 1 })).await.expect("Failed to set");
    assert_eq!(
        store.get::<serde_json::Value>("a").await.expect("Failed to get"),
        Some(json!({ "n": 1 }))
    );

    store.set("a", &json!({ "n": 2 })).await.expect("Failed to overwrite");
    assert_eq!(
        store.get::<serde_json::Value>("a").await.expect("Failed to get"),
        Some(json!({ "n": 2 }))
    );

    store.remove("a").await.expect("Failed to remove");
    assert_eq!(store.get::<serde_json::Value>("a").await.expect("Failed to get"), None);
}

#[test]
fn test_local_scenario() {
    let store = StorageFactory::create_memory_local();

    store.set("a", &json!({ "n": 1 })).expect("Failed to set");
    assert_eq!(
        store.get::<serde_json::Value>("a").expect("Failed to get"),
        Some(json!({ "n": 1 }))
    );

    store.set("a", &json!({ "n": 2 })).expect("Failed to overwrite");
    assert_eq!(
        store.get::<serde_json::Value>("a").expect("Failed to get"),
        Some(json!({ "n": 2 }))
    );

    store.remove("a").expect("Failed to remove");
    assert_eq!(store.get::<serde_json::Value>("a").expect("Failed to get"), None);
}

#[tokio::test]
async fn test_adapters_are_independent() {
    let idb = StorageFactory::create_memory_idb();
    let local = StorageFactory::create_memory_local();

    idb.set("shared", &sample_image()).await.unwrap();
    assert_eq!(local.get::<ScannedImage>("shared").unwrap(), None);

    local.set("shared", &1).unwrap();
    assert_eq!(idb.get::<ScannedImage>("shared").await.unwrap(), Some(sample_image()));
}

#[tokio::test]
async fn test_remove_missing_key_is_noop() {
    let idb = StorageFactory::create_memory_idb();
    let local = StorageFactory::create_memory_local();

    idb.remove("never-written").await.unwrap();
    local.remove("never-written").unwrap();
}

#[tokio::test]
async fn test_stores_share_engine_state() {
    let engine = MemoryEngine::new();
    let writer = IdbStore::new(engine.clone());
    let reader = IdbStore::new(engine.clone());

    writer.set("img-1", &sample_image()).await.unwrap();
    assert_eq!(reader.get::<ScannedImage>("img-1").await.unwrap(), Some(sample_image()));

    // Both adapters opened the same database once each; the store was created once
    assert_eq!(engine.open_count(), 2);
    assert_eq!(engine.store_names("QR_APP_DB"), vec!["images".to_string()]);
    assert_eq!(engine.database_version("QR_APP_DB"), Some(1));
}

#[tokio::test]
async fn test_newer_database_is_a_version_mismatch() {
    let engine = MemoryEngine::new();
    let newer = IdbStore::with_config(
        engine.clone(),
        StoreConfig {
            version: 2,
            ..Default::default()
        },
    )
    .unwrap();
    newer.set("a", &1).await.unwrap();

    let older = IdbStore::new(engine);
    let err = older.get::<i32>("a").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Storage(StorageError::VersionMismatch {
            requested: 1,
            existing: 2
        })
    ));
}

#[tokio::test]
async fn test_engine_failures_propagate() {
    let engine = MemoryEngine::new();
    let store = IdbStore::new(engine.clone());

    engine.inject_fault(EngineFault::Open);
    assert!(store.get::<i32>("a").await.is_err());

    store.set("a", &1).await.unwrap();
    engine.inject_fault(EngineFault::Transaction);
    assert!(store.remove("a").await.is_err());
    assert_eq!(store.get::<i32>("a").await.unwrap(), Some(1));
}

#[test]
fn test_error_types() {
    let error = Error::from(StorageError::QuotaExceeded);
    assert!(error.to_string().contains("Storage error"));
    assert!(error.to_string().contains("quota"));
}
