//! In-memory storage engines
//!
//! `MemoryEngine` behaves like an origin's IndexedDB: named databases with a
//! version, record stores created only by schema upgrades, upgrades that roll
//! back on failure. `MemoryFlatStorage` behaves like an origin's
//! localStorage, including an optional quota. Clones share their contents.

use crate::error::{Result, StorageError, StorageResult};
use crate::serializer;
use crate::storage::engine::{DatabaseSchema, FlatStorage, ObjectStoreConnection, ObjectStoreEngine};
use crate::storage::migrations::{run_migrations, SchemaUpgrade};
use crate::storage::storage_api::StorageBackend;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Failure to inject into the next matching engine call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
    /// The next open request fails
    Open,
    /// The next transaction fails
    Transaction,
    /// The next schema upgrade fails after its steps have run
    Upgrade,
    /// The host closes the connection under the next transaction, as when
    /// site data is cleared
    HostClose,
}

#[derive(Debug, Clone, Default)]
struct MemoryDatabase {
    version: u32,
    stores: HashMap<String, BTreeMap<String, Value>>,
}

impl SchemaUpgrade for MemoryDatabase {
    fn has_store(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    fn create_store(&mut self, name: &str) -> StorageResult<()> {
        if self.stores.contains_key(name) {
            return Err(StorageError::OperationFailed {
                operation: "create_store".to_string(),
                reason: format!("object store {} already exists", name),
            });
        }
        self.stores.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }
}

/// In-memory embedded object store
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    databases: Arc<RwLock<HashMap<String, MemoryDatabase>>>,
    fault: Arc<Mutex<Option<EngineFault>>>,
    opens: Arc<AtomicUsize>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next matching engine call fail, once
    pub fn inject_fault(&self, fault: EngineFault) {
        *self.fault.lock() = Some(fault);
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Stored version of a database, if it exists
    pub fn database_version(&self, name: &str) -> Option<u32> {
        self.databases.read().get(name).map(|db| db.version)
    }

    /// Names of the record stores in a database
    pub fn store_names(&self, name: &str) -> Vec<String> {
        let databases = self.databases.read();
        let mut names: Vec<String> = databases
            .get(name)
            .map(|db| db.stores.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn take_fault(&self, fault: EngineFault) -> bool {
        let mut slot = self.fault.lock();
        if *slot == Some(fault) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

impl ObjectStoreEngine for MemoryEngine {
    type Connection = MemoryConnection;

    async fn open(&self, schema: &DatabaseSchema) -> StorageResult<MemoryConnection> {
        if self.take_fault(EngineFault::Open) {
            return Err(StorageError::Open {
                database: schema.name.clone(),
                reason: "injected open failure".to_string(),
            });
        }
        if schema.version == 0 {
            return Err(StorageError::Open {
                database: schema.name.clone(),
                reason: "version must be at least 1".to_string(),
            });
        }

        let mut databases = self.databases.write();
        let existing = databases.get(&schema.name).map_or(0, |db| db.version);

        if schema.version < existing {
            return Err(StorageError::VersionMismatch {
                requested: schema.version,
                existing,
            });
        }

        if schema.version > existing {
            // Upgrade a copy so a failing step leaves the stored database untouched
            let mut staged = databases.get(&schema.name).cloned().unwrap_or_default();
            run_migrations(&mut staged, existing, schema)?;
            if self.take_fault(EngineFault::Upgrade) {
                return Err(StorageError::Upgrade {
                    version: schema.version,
                    reason: "injected upgrade failure".to_string(),
                });
            }
            staged.version = schema.version;
            databases.insert(schema.name.clone(), staged);
        }

        self.opens.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryConnection {
            engine: self.clone(),
            database: schema.name.clone(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Open handle to a database in a [`MemoryEngine`]
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    engine: MemoryEngine,
    database: String,
    closed: Arc<AtomicBool>,
}

impl MemoryConnection {
    fn begin(&self, operation: &str) -> StorageResult<()> {
        if self.engine.take_fault(EngineFault::HostClose) {
            self.close();
        }
        if self.is_closed() {
            return Err(StorageError::ConnectionClosed {
                database: self.database.clone(),
            });
        }
        if self.engine.take_fault(EngineFault::Transaction) {
            return Err(StorageError::Transaction {
                operation: operation.to_string(),
                reason: "injected transaction failure".to_string(),
            });
        }
        Ok(())
    }

    fn with_store<T>(
        &self,
        store: &str,
        f: impl FnOnce(&mut BTreeMap<String, Value>) -> T,
    ) -> StorageResult<T> {
        let mut databases = self.engine.databases.write();
        let records = databases
            .get_mut(&self.database)
            .and_then(|db| db.stores.get_mut(store))
            .ok_or_else(|| StorageError::StoreNotFound {
                store: store.to_string(),
            })?;
        Ok(f(records))
    }
}

impl ObjectStoreConnection for MemoryConnection {
    async fn put<V>(&self, store: &str, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        self.begin("put")?;
        let value = serializer::to_value(value)?;
        self.with_store(store, |records| {
            records.insert(key.to_string(), value);
        })?;
        Ok(())
    }

    async fn get<V>(&self, store: &str, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        self.begin("get")?;
        let value = self.with_store(store, |records| records.get(key).cloned())?;
        match value {
            Some(value) => Ok(Some(serializer::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, store: &str, key: &str) -> Result<()> {
        self.begin("delete")?;
        self.with_store(store, |records| {
            records.remove(key);
        })?;
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory flat string storage
#[derive(Debug, Clone, Default)]
pub struct MemoryFlatStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryFlatStorage {
    /// Create an unbounded storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage that rejects writes once keys plus values exceed
    /// `quota` UTF-16 code units, the unit browsers account localStorage in
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(quota),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the storage holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove every entry, like clearing site data
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

impl FlatStorage for MemoryFlatStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write();

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| utf16_len(k) + utf16_len(v))
                .sum();
            if used + utf16_len(key) + utf16_len(value) > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
