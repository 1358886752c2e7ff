//! Embedded object store adapter
//!
//! Stores structured values in a single record store of a single database.
//! The database is opened lazily on first use and, under the default
//! [`ConnectionPolicy::Shared`], the handle is kept for every later call.
//! Failed opens are not cached, so the next call tries again. A handle the
//! host has closed is replaced on the next call, and a call that fails
//! because its handle was closed underneath it is retried once on a fresh
//! handle.

use crate::config::{ConnectionPolicy, StoreConfig};
use crate::error::{Error, Result, StorageError};
use crate::storage::engine::{DatabaseSchema, ObjectStoreConnection, ObjectStoreEngine};
use crate::storage::storage_api::{AsyncKeyValueStore, StorageBackend};
use futures::lock::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key-value adapter over an embedded object store
pub struct IdbStore<E: ObjectStoreEngine> {
    engine: E,
    schema: DatabaseSchema,
    policy: ConnectionPolicy,
    connection: Mutex<Option<E::Connection>>,
}

impl<E: ObjectStoreEngine> IdbStore<E> {
    /// Create an adapter for the default `QR_APP_DB` / `images` store
    pub fn new(engine: E) -> Self {
        let config = StoreConfig::default();
        Self {
            engine,
            schema: config.schema(),
            policy: config.connection_policy,
            connection: Mutex::new(None),
        }
    }

    /// Create an adapter from an explicit configuration
    pub fn with_config(engine: E, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            schema: config.schema(),
            policy: config.connection_policy,
            connection: Mutex::new(None),
        })
    }

    /// Database and store this adapter works on
    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    /// Underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Drop the shared handle; the next call opens a new one
    pub async fn close(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            tracing::debug!(database = %self.schema.name, "closing shared connection");
            connection.close();
        }
    }

    async fn acquire(&self) -> Result<E::Connection> {
        if self.policy == ConnectionPolicy::PerOperation {
            return Ok(self.open().await?);
        }

        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            if !connection.is_closed() {
                return Ok(connection.clone());
            }
            tracing::info!(database = %self.schema.name, "shared connection was closed, reopening");
        }
        let connection = self.open().await?;
        *slot = Some(connection.clone());
        Ok(connection)
    }

    fn release(&self, connection: E::Connection) {
        if self.policy == ConnectionPolicy::PerOperation {
            connection.close();
        }
    }

    async fn open(&self) -> Result<E::Connection> {
        let connection = self.engine.open(&self.schema).await.inspect_err(|e| {
            tracing::warn!(database = %self.schema.name, error = %e, "failed to open database");
        })?;
        tracing::info!(
            database = %self.schema.name,
            version = self.schema.version,
            backend = %self.engine.backend_type(),
            "opened database"
        );
        Ok(connection)
    }
}

fn connection_closed<T>(result: &Result<T>) -> bool {
    matches!(result, Err(Error::Storage(StorageError::ConnectionClosed { .. })))
}

impl<E: ObjectStoreEngine> AsyncKeyValueStore for IdbStore<E> {
    async fn set<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        tracing::debug!(store = %self.schema.store, key, "idb set");
        let mut retried = false;
        loop {
            let connection = self.acquire().await?;
            let result = connection.put(&self.schema.store, key, value).await;
            self.release(connection);
            if connection_closed(&result) && !retried {
                retried = true;
                continue;
            }
            return result.inspect_err(|e| tracing::warn!(key, error = %e, "idb set failed"));
        }
    }

    async fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        tracing::debug!(store = %self.schema.store, key, "idb get");
        let mut retried = false;
        loop {
            let connection = self.acquire().await?;
            let result = connection.get(&self.schema.store, key).await;
            self.release(connection);
            if connection_closed(&result) && !retried {
                retried = true;
                continue;
            }
            return result.inspect_err(|e| tracing::warn!(key, error = %e, "idb get failed"));
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        tracing::debug!(store = %self.schema.store, key, "idb remove");
        let mut retried = false;
        loop {
            let connection = self.acquire().await?;
            let result = connection.delete(&self.schema.store, key).await;
            self.release(connection);
            if connection_closed(&result) && !retried {
                retried = true;
                continue;
            }
            return result.inspect_err(|e| tracing::warn!(key, error = %e, "idb remove failed"));
        }
    }

    fn backend_type(&self) -> StorageBackend {
        self.engine.backend_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_adapter::{EngineFault, MemoryEngine};
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        n: u32,
    }

    #[tokio::test]
    async fn test_set_get_overwrite_remove() {
        let store = IdbStore::new(MemoryEngine::new());

        store.set("a", &Counter { n: 1 }).await.unwrap();
        assert_eq!(store.get::<Counter>("a").await.unwrap(), Some(Counter { n: 1 }));

        store.set("a", &Counter { n: 2 }).await.unwrap();
        assert_eq!(store.get::<Counter>("a").await.unwrap(), Some(Counter { n: 2 }));

        store.remove("a").await.unwrap();
        assert_eq!(store.get::<Counter>("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shared_connection_opens_once() {
        let engine = MemoryEngine::new();
        let store = IdbStore::new(engine.clone());

        store.set("a", &1).await.unwrap();
        store.get::<i32>("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert_eq!(engine.open_count(), 1);

        store.close().await;
        store.get::<i32>("a").await.unwrap();
        assert_eq!(engine.open_count(), 2);
    }

    #[tokio::test]
    async fn test_per_operation_policy_opens_every_call() {
        let engine = MemoryEngine::new();
        let config = StoreConfig {
            connection_policy: ConnectionPolicy::PerOperation,
            ..Default::default()
        };
        let store = IdbStore::with_config(engine.clone(), config).unwrap();

        store.set("a", &1).await.unwrap();
        assert_eq!(store.get::<i32>("a").await.unwrap(), Some(1));
        store.remove("a").await.unwrap();
        assert_eq!(engine.open_count(), 3);
    }

    #[tokio::test]
    async fn test_open_failure_surfaces_and_is_retried() {
        let engine = MemoryEngine::new();
        let store = IdbStore::new(engine.clone());

        engine.inject_fault(EngineFault::Open);
        let err = store.set("a", &1).await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Open { .. })));

        store.set("a", &1).await.unwrap();
        assert_eq!(store.get::<i32>("a").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_host_closed_shared_connection_is_replaced() {
        let engine = MemoryEngine::new();
        let store = IdbStore::new(engine.clone());
        store.set("a", &1).await.unwrap();

        if let Some(connection) = store.connection.lock().await.as_ref() {
            connection.close();
        }

        for _ in 0..5 {
            assert_eq!(store.get::<i32>("a").await.unwrap(), Some(1));
        }
        assert_eq!(engine.open_count(), 2);
    }

    #[tokio::test]
    async fn test_call_on_connection_closed_underneath_is_retried() {
        let engine = MemoryEngine::new();
        let store = IdbStore::new(engine.clone());
        store.set("a", &1).await.unwrap();

        engine.inject_fault(EngineFault::HostClose);
        assert_eq!(store.get::<i32>("a").await.unwrap(), Some(1));

        engine.inject_fault(EngineFault::HostClose);
        store.set("a", &2).await.unwrap();

        engine.inject_fault(EngineFault::HostClose);
        store.remove("a").await.unwrap();

        assert_eq!(store.get::<i32>("a").await.unwrap(), None);
        assert_eq!(engine.open_count(), 4);
    }

    #[tokio::test]
    async fn test_failed_upgrade_surfaces_and_rolls_back() {
        let engine = MemoryEngine::new();
        let store = IdbStore::new(engine.clone());

        engine.inject_fault(EngineFault::Upgrade);
        let err = store.set("a", &1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::Upgrade { version: 1, .. })
        ));
        assert_eq!(engine.database_version("QR_APP_DB"), None);
        assert!(engine.store_names("QR_APP_DB").is_empty());

        // The failed upgrade is not cached either
        store.set("a", &1).await.unwrap();
        assert_eq!(engine.database_version("QR_APP_DB"), Some(1));
        assert_eq!(store.get::<i32>("a").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_transaction_failure_surfaces() {
        let engine = MemoryEngine::new();
        let store = IdbStore::new(engine.clone());
        store.set("a", &1).await.unwrap();

        engine.inject_fault(EngineFault::Transaction);
        let err = store.set("a", &2).await.unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Transaction { .. })));

        // The failed write left the previous record in place
        assert_eq!(store.get::<i32>("a").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_deserialization_error() {
        let store = IdbStore::new(MemoryEngine::new());
        store.set("a", "text").await.unwrap();
        let err = store.get::<Counter>("a").await.unwrap_err();
        assert!(matches!(err, Error::Serializer(_)));
    }

    #[tokio::test]
    async fn test_with_config_rejects_invalid() {
        let config = StoreConfig {
            version: 0,
            ..Default::default()
        };
        assert!(IdbStore::with_config(MemoryEngine::new(), config).is_err());
    }
}
