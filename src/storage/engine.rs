//! Host storage substrates
//!
//! The adapters never talk to the browser directly. They drive one of two
//! host traits: an asynchronous object-store engine with versioned databases
//! and per-call transactions, and a synchronous string map. The browser
//! implementations live in `storage_browser`, the in-memory ones in
//! `memory_adapter`.

use crate::error::{Result, StorageResult};
use crate::storage::storage_api::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Database and record store an engine is asked to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    /// Database name
    pub name: String,
    /// Schema version to open at
    pub version: u32,
    /// Record store that must exist after the open
    pub store: String,
}

/// Asynchronous embedded object store (IndexedDB or compatible)
pub trait ObjectStoreEngine {
    /// Open database handle
    type Connection: ObjectStoreConnection + Clone;

    /// Open the database at `schema.version`, running the schema upgrade
    /// when the stored version is older.
    fn open(
        &self,
        schema: &DatabaseSchema,
    ) -> impl Future<Output = StorageResult<Self::Connection>>;

    /// Backend kind
    fn backend_type(&self) -> StorageBackend;
}

/// Handle to an open embedded database
///
/// Every call runs in its own transaction and resolves when that
/// transaction completes or fails.
pub trait ObjectStoreConnection {
    /// Write `value` under `key`, replacing any existing record
    fn put<V>(&self, store: &str, key: &str, value: &V) -> impl Future<Output = Result<()>>
    where
        V: Serialize + ?Sized;

    /// Read the record under `key`
    fn get<V>(&self, store: &str, key: &str) -> impl Future<Output = Result<Option<V>>>
    where
        V: DeserializeOwned;

    /// Delete the record under `key`; absent keys are not an error
    fn delete(&self, store: &str, key: &str) -> impl Future<Output = Result<()>>;

    /// Close the handle. Transactions already issued still complete.
    fn close(&self);

    /// Whether the handle was closed, by `close` or by the host. A closed
    /// handle only yields `StorageError::ConnectionClosed`.
    fn is_closed(&self) -> bool;
}

/// Synchronous string-keyed, string-valued storage (localStorage or compatible)
pub trait FlatStorage {
    /// Read the text stored under `key`
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any existing entry
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete the entry under `key`; absent keys are not an error
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Backend kind
    fn backend_type(&self) -> StorageBackend;
}
