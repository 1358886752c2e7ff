//! Storage module for key-value persistence
//!
//! This module provides two independent key-value adapters:
//! - **Embedded object store** ([`IdbStore`]) - asynchronous, structured values,
//!   backed by IndexedDB in the browser
//! - **Flat string storage** ([`LocalStore`]) - synchronous, values kept as JSON
//!   text, backed by localStorage in the browser
//!
//! Both adapters are generic over the host substrate so they run against the
//! in-memory engines from [`memory_adapter`] outside a browser.
//!
//! # Examples
//!
//! ## Flat storage
//!
//! ```rust
//! use qr_app_storage::storage::{KeyValueStoreSync, StorageFactory};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StorageFactory::create_memory_local();
//!
//! store.set("a", &json!({ "n": 1 }))?;
//! assert_eq!(store.get::<serde_json::Value>("a")?, Some(json!({ "n": 1 })));
//!
//! store.remove("a")?;
//! assert_eq!(store.get::<serde_json::Value>("a")?, None);
//! # Ok(())
//! # }
//! ```
//!
//! ## Embedded object store
//!
//! ```rust
//! use qr_app_storage::storage::{AsyncKeyValueStore, StorageFactory};
//!
//! # async fn run() -> qr_app_storage::Result<()> {
//! let store = StorageFactory::create_memory_idb();
//!
//! store.set("scan", &vec![1u8, 2, 3]).await?;
//! let bytes: Option<Vec<u8>> = store.get("scan").await?;
//! assert_eq!(bytes, Some(vec![1, 2, 3]));
//! # Ok(())
//! # }
//! # tokio_test::block_on(run()).unwrap();
//! ```

// Core storage API and host traits
pub mod engine;
pub mod migrations;
pub mod storage_api;

// Adapters
pub mod storage_flat;
pub mod storage_idb;

// Engines
pub mod memory_adapter;

#[cfg(feature = "wasm")]
pub mod storage_browser;

// Re-export main types for convenience
pub use engine::{DatabaseSchema, FlatStorage, ObjectStoreConnection, ObjectStoreEngine};
pub use memory_adapter::{EngineFault, MemoryConnection, MemoryEngine, MemoryFlatStorage};
pub use storage_api::{AsyncKeyValueStore, KeyValueStoreSync, StorageBackend};
pub use storage_flat::LocalStore;
pub use storage_idb::IdbStore;

#[cfg(feature = "wasm")]
pub use storage_browser::{BrowserLocalStorage, IdbConnection, IndexedDbEngine};

use crate::config::StoreConfig;
use crate::error::Result;

/// Storage constants
pub mod constants {
    //! Fixed names of the persisted layout

    /// Name of the embedded database
    pub const DB_NAME: &str = "QR_APP_DB";

    /// Name of the record store inside the embedded database
    pub const STORE_NAME: &str = "images";

    /// Schema version the embedded database is opened at
    pub const DB_VERSION: u32 = 1;
}

/// Storage factory for creating adapter instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create an embedded-store adapter over a fresh in-memory engine
    pub fn create_memory_idb() -> IdbStore<MemoryEngine> {
        IdbStore::new(MemoryEngine::new())
    }

    /// Create a flat adapter over a fresh in-memory storage
    pub fn create_memory_local() -> LocalStore<MemoryFlatStorage> {
        LocalStore::new(MemoryFlatStorage::new())
    }

    /// Create an embedded-store adapter over any engine with an explicit configuration
    pub fn create_idb<E: ObjectStoreEngine>(engine: E, config: StoreConfig) -> Result<IdbStore<E>> {
        IdbStore::with_config(engine, config)
    }

    /// Create an embedded-store adapter over `window.indexedDB` (requires `wasm` feature)
    #[cfg(feature = "wasm")]
    pub fn create_indexed_db(config: StoreConfig) -> Result<IdbStore<IndexedDbEngine>> {
        IdbStore::with_config(IndexedDbEngine::from_window()?, config)
    }

    /// Create a flat adapter over `window.localStorage` (requires `wasm` feature)
    #[cfg(feature = "wasm")]
    pub fn create_local_storage() -> Result<LocalStore<BrowserLocalStorage>> {
        Ok(LocalStore::new(BrowserLocalStorage::from_window()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionPolicy;

    #[test]
    fn test_constants() {
        assert_eq!(constants::DB_NAME, "QR_APP_DB");
        assert_eq!(constants::STORE_NAME, "images");
        assert_eq!(constants::DB_VERSION, 1);
    }

    #[test]
    fn test_factory_memory_local() {
        let store = StorageFactory::create_memory_local();
        assert_eq!(store.backend_type(), StorageBackend::Memory);
    }

    #[tokio::test]
    async fn test_factory_memory_idb() {
        let store = StorageFactory::create_memory_idb();
        assert_eq!(store.schema().name, constants::DB_NAME);
        store.set("k", &true).await.unwrap();
        assert_eq!(store.get::<bool>("k").await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_factory_custom_idb() {
        let engine = MemoryEngine::new();
        let config = StoreConfig {
            database_name: "other".to_string(),
            store_name: "thumbs".to_string(),
            connection_policy: ConnectionPolicy::PerOperation,
            ..Default::default()
        };
        let store = StorageFactory::create_idb(engine.clone(), config).unwrap();
        store.set("k", &1).await.unwrap();
        assert_eq!(engine.store_names("other"), vec!["thumbs".to_string()]);
        assert_eq!(engine.database_version(constants::DB_NAME), None);
    }
}
