//! Flat string storage adapter
//!
//! Values are stored as JSON text. Serialization happens before the host is
//! touched, so a value that cannot be serialized never reaches storage.

use crate::error::Result;
use crate::serializer;
use crate::storage::engine::FlatStorage;
use crate::storage::storage_api::{KeyValueStoreSync, StorageBackend};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key-value adapter over synchronous string storage
#[derive(Debug, Clone)]
pub struct LocalStore<S: FlatStorage> {
    storage: S,
}

impl<S: FlatStorage> LocalStore<S> {
    /// Wrap a flat storage facility
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: FlatStorage> KeyValueStoreSync for LocalStore<S> {
    fn set<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        tracing::debug!(key, "local set");
        let text = serializer::to_text(value)?;
        self.storage
            .set_item(key, &text)
            .inspect_err(|e| tracing::warn!(key, error = %e, "local set failed"))?;
        Ok(())
    }

    fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        tracing::debug!(key, "local get");
        match self.storage.get_item(key)? {
            Some(text) => Ok(Some(serializer::from_text(&text)?)),
            None => Ok(None),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        tracing::debug!(key, "local remove");
        self.storage.remove_item(key)?;
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        self.storage.backend_type()
    }
}
