//! Key-value storage API
//!
//! This module provides the interface shared by both adapters: an async one
//! for the embedded object store and a synchronous one for flat string
//! storage. Values are any `serde` type; the caller names the concrete type
//! at each call site.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageBackend {
    /// Browser IndexedDB
    IndexedDb,
    /// Browser localStorage
    LocalStorage,
    /// In-process memory
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::IndexedDb => "indexeddb",
            StorageBackend::LocalStorage => "localstorage",
            StorageBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// Asynchronous key-value API
///
/// Futures are not required to be `Send`; browser handles are bound to the
/// thread that created them.
pub trait AsyncKeyValueStore {
    /// Store a value under `key`, overwriting any existing value
    fn set<V>(&self, key: &str, value: &V) -> impl Future<Output = Result<()>>
    where
        V: Serialize + ?Sized;

    /// Get the value under `key`, or `None` if no record exists
    fn get<V>(&self, key: &str) -> impl Future<Output = Result<Option<V>>>
    where
        V: DeserializeOwned;

    /// Remove the value under `key`; removing an absent key succeeds
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>>;

    /// Get storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Synchronous key-value API
pub trait KeyValueStoreSync {
    /// Store a value under `key`, overwriting any existing value
    fn set<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized;

    /// Get the value under `key`, or `None` if no entry exists
    fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned;

    /// Remove the value under `key`; removing an absent key succeeds
    fn remove(&self, key: &str) -> Result<()>;

    /// Get storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display() {
        assert_eq!(StorageBackend::IndexedDb.to_string(), "indexeddb");
        assert_eq!(StorageBackend::LocalStorage.to_string(), "localstorage");
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
    }
}
