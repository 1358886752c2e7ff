//! Browser storage engines over `web-sys`
//!
//! `IndexedDbEngine` drives `window.indexedDB`, `BrowserLocalStorage` drives
//! `window.localStorage`. IndexedDB requests report back through DOM event
//! handlers; each handler pair is bridged to a `oneshot` channel and awaited,
//! and the handlers are detached again once the request settles. Open
//! databases keep `versionchange` and `close` handlers for as long as a
//! handle to them is alive, so another context can upgrade or delete the
//! database and the adapter notices when the host has closed it.

use crate::error::{Result, SerializerError, StorageError, StorageResult};
use crate::storage::engine::{DatabaseSchema, FlatStorage, ObjectStoreConnection, ObjectStoreEngine};
use crate::storage::migrations::{run_migrations, SchemaUpgrade};
use crate::storage::storage_api::StorageBackend;
use futures::channel::oneshot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    DomException, Event, IdbDatabase, IdbFactory, IdbObjectStore, IdbRequest, IdbTransaction,
    IdbTransactionMode, IdbVersionChangeEvent, Storage,
};

type Settled = std::result::Result<JsValue, JsValue>;

fn describe(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<DomException>() {
        format!("{}: {}", exception.name(), exception.message())
    } else if let Some(text) = value.as_string() {
        text
    } else {
        format!("{:?}", value)
    }
}

fn exception_name(value: &JsValue) -> Option<String> {
    value.dyn_ref::<DomException>().map(|e| e.name())
}

fn transaction_error(operation: &str, error: JsValue) -> StorageError {
    match exception_name(&error).as_deref() {
        Some("QuotaExceededError") => StorageError::QuotaExceeded,
        _ => StorageError::Transaction {
            operation: operation.to_string(),
            reason: describe(&error),
        },
    }
}

fn open_error(schema: &DatabaseSchema, error: JsValue) -> StorageError {
    StorageError::Open {
        database: schema.name.clone(),
        reason: describe(&error),
    }
}

/// Wait for `success` or `error` on a request
async fn settle_request(request: &IdbRequest) -> Settled {
    let (sender, receiver) = oneshot::channel::<Settled>();
    let sender = Rc::new(RefCell::new(Some(sender)));

    let on_success = {
        let sender = Rc::clone(&sender);
        let request = request.clone();
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(request.result());
            }
        })
    };
    let on_error = {
        let sender = Rc::clone(&sender);
        let request = request.clone();
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(sender) = sender.borrow_mut().take() {
                let error = match request.error() {
                    Ok(Some(exception)) => exception.into(),
                    Ok(None) => JsValue::from_str("request failed without an error"),
                    Err(e) => e,
                };
                let _ = sender.send(Err(error));
            }
        })
    };

    request.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
    request.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    let settled = receiver
        .await
        .unwrap_or_else(|_| Err(JsValue::from_str("request handler was dropped")));

    request.set_onsuccess(None);
    request.set_onerror(None);
    settled
}

/// Wait for `complete`, `error` or `abort` on a transaction
async fn settle_transaction(transaction: &IdbTransaction) -> std::result::Result<(), JsValue> {
    let (sender, receiver) = oneshot::channel::<std::result::Result<(), JsValue>>();
    let sender = Rc::new(RefCell::new(Some(sender)));

    let on_complete = {
        let sender = Rc::clone(&sender);
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(Ok(()));
            }
        })
    };
    let on_failure = {
        let sender = Rc::clone(&sender);
        let transaction = transaction.clone();
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(sender) = sender.borrow_mut().take() {
                let error = transaction
                    .error()
                    .map(JsValue::from)
                    .unwrap_or_else(|| JsValue::from_str("transaction aborted"));
                let _ = sender.send(Err(error));
            }
        })
    };

    transaction.set_oncomplete(Some(on_complete.as_ref().unchecked_ref()));
    transaction.set_onerror(Some(on_failure.as_ref().unchecked_ref()));
    transaction.set_onabort(Some(on_failure.as_ref().unchecked_ref()));

    let settled = receiver
        .await
        .unwrap_or_else(|_| Err(JsValue::from_str("transaction handler was dropped")));

    transaction.set_oncomplete(None);
    transaction.set_onerror(None);
    transaction.set_onabort(None);
    settled
}

struct IdbUpgrade {
    db: IdbDatabase,
}

impl SchemaUpgrade for IdbUpgrade {
    fn has_store(&self, name: &str) -> bool {
        self.db.object_store_names().contains(name)
    }

    fn create_store(&mut self, name: &str) -> StorageResult<()> {
        self.db
            .create_object_store(name)
            .map(|_| ())
            .map_err(|e| StorageError::OperationFailed {
                operation: "create_object_store".to_string(),
                reason: describe(&e),
            })
    }
}

/// IndexedDB of the current window
#[derive(Debug, Clone)]
pub struct IndexedDbEngine {
    factory: IdbFactory,
}

impl IndexedDbEngine {
    /// Use `window.indexedDB`
    pub fn from_window() -> StorageResult<Self> {
        let unavailable = || StorageError::BackendNotAvailable {
            backend: "indexedDB".to_string(),
        };
        let window = web_sys::window().ok_or_else(unavailable)?;
        let factory = window
            .indexed_db()
            .map_err(|_| unavailable())?
            .ok_or_else(unavailable)?;
        Ok(Self { factory })
    }

    /// Use an explicit factory, e.g. one taken from a worker scope
    pub fn with_factory(factory: IdbFactory) -> Self {
        Self { factory }
    }
}

impl ObjectStoreEngine for IndexedDbEngine {
    type Connection = IdbConnection;

    async fn open(&self, schema: &DatabaseSchema) -> StorageResult<IdbConnection> {
        let request = self
            .factory
            .open_with_u32(&schema.name, schema.version)
            .map_err(|e| open_error(schema, e))?;

        let upgrade_failure: Rc<RefCell<Option<StorageError>>> = Rc::default();
        let on_upgrade = {
            let request = request.clone();
            let schema = schema.clone();
            let upgrade_failure = Rc::clone(&upgrade_failure);
            Closure::<dyn FnMut(IdbVersionChangeEvent)>::new(move |event: IdbVersionChangeEvent| {
                let old_version = event.old_version() as u32;
                let outcome = request
                    .result()
                    .map_err(|e| StorageError::Upgrade {
                        version: schema.version,
                        reason: describe(&e),
                    })
                    .and_then(|db| {
                        let mut upgrade = IdbUpgrade {
                            db: db.unchecked_into(),
                        };
                        run_migrations(&mut upgrade, old_version, &schema)
                    });

                if let Err(err) = outcome {
                    // Aborting the versionchange transaction fails the open request
                    if let Some(transaction) = request.transaction() {
                        let _ = transaction.abort();
                    }
                    *upgrade_failure.borrow_mut() = Some(err);
                }
            })
        };
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let settled = settle_request(&request).await;
        request.set_onupgradeneeded(None);

        match settled {
            Ok(db) => Ok(IdbConnection::attach(db.unchecked_into())),
            Err(error) => {
                let failure = upgrade_failure.borrow_mut().take();
                Err(failure.unwrap_or_else(|| open_error(schema, error)))
            }
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::IndexedDb
    }
}

/// Open IndexedDB database
#[derive(Debug, Clone)]
pub struct IdbConnection {
    db: IdbDatabase,
    closed: Rc<Cell<bool>>,
    _lifecycle: Rc<Lifecycle>,
}

/// `versionchange` and `close` handlers of an open database, detached when
/// the last handle goes away
struct Lifecycle {
    db: IdbDatabase,
    _on_versionchange: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(Event)>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle").finish_non_exhaustive()
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.db.set_onversionchange(None);
        self.db.set_onclose(None);
    }
}

impl IdbConnection {
    fn attach(db: IdbDatabase) -> Self {
        let closed = Rc::new(Cell::new(false));

        // Another context wants to upgrade or delete the database
        let on_versionchange = {
            let db = db.clone();
            let closed = Rc::clone(&closed);
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                tracing::info!(database = %db.name(), "version change requested, closing");
                db.close();
                closed.set(true);
            })
        };
        // Fired only when the host closes the database, e.g. site data cleared
        let on_close = {
            let db = db.clone();
            let closed = Rc::clone(&closed);
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                tracing::warn!(database = %db.name(), "database closed by the host");
                closed.set(true);
            })
        };
        db.set_onversionchange(Some(on_versionchange.as_ref().unchecked_ref()));
        db.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let lifecycle = Lifecycle {
            db: db.clone(),
            _on_versionchange: on_versionchange,
            _on_close: on_close,
        };
        Self {
            db,
            closed,
            _lifecycle: Rc::new(lifecycle),
        }
    }

    fn closed_error(&self) -> StorageError {
        StorageError::ConnectionClosed {
            database: self.db.name(),
        }
    }

    fn begin(
        &self,
        store: &str,
        mode: IdbTransactionMode,
        operation: &str,
    ) -> StorageResult<(IdbTransaction, IdbObjectStore)> {
        if self.closed.get() {
            return Err(self.closed_error());
        }
        let transaction = self
            .db
            .transaction_with_str_and_mode(store, mode)
            .map_err(|e| match exception_name(&e).as_deref() {
                Some("NotFoundError") => StorageError::StoreNotFound {
                    store: store.to_string(),
                },
                // Thrown once the close pending flag is set
                Some("InvalidStateError") => {
                    self.closed.set(true);
                    self.closed_error()
                }
                _ => transaction_error(operation, e),
            })?;
        let object_store = transaction
            .object_store(store)
            .map_err(|e| transaction_error(operation, e))?;
        Ok((transaction, object_store))
    }
}

impl ObjectStoreConnection for IdbConnection {
    async fn put<V>(&self, store: &str, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let value = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| SerializerError::SerializationFailed {
                reason: e.to_string(),
            })?;

        let (transaction, object_store) = self.begin(store, IdbTransactionMode::Readwrite, "put")?;
        object_store
            .put_with_key(&value, &JsValue::from_str(key))
            .map_err(|e| transaction_error("put", e))?;
        settle_transaction(&transaction)
            .await
            .map_err(|e| transaction_error("put", e))?;
        Ok(())
    }

    async fn get<V>(&self, store: &str, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        let (_transaction, object_store) =
            self.begin(store, IdbTransactionMode::Readonly, "get")?;
        let request = object_store
            .get(&JsValue::from_str(key))
            .map_err(|e| transaction_error("get", e))?;
        let value = settle_request(&request)
            .await
            .map_err(|e| transaction_error("get", e))?;

        if value.is_undefined() {
            return Ok(None);
        }
        let value = serde_wasm_bindgen::from_value(value).map_err(|e| {
            SerializerError::DeserializationFailed {
                reason: e.to_string(),
            }
        })?;
        Ok(Some(value))
    }

    async fn delete(&self, store: &str, key: &str) -> Result<()> {
        let (transaction, object_store) =
            self.begin(store, IdbTransactionMode::Readwrite, "delete")?;
        object_store
            .delete(&JsValue::from_str(key))
            .map_err(|e| transaction_error("delete", e))?;
        settle_transaction(&transaction)
            .await
            .map_err(|e| transaction_error("delete", e))?;
        Ok(())
    }

    fn close(&self) {
        self.closed.set(true);
        self.db.close();
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// localStorage of the current window
#[derive(Debug, Clone)]
pub struct BrowserLocalStorage {
    storage: Storage,
}

impl BrowserLocalStorage {
    /// Use `window.localStorage`
    pub fn from_window() -> StorageResult<Self> {
        let unavailable = || StorageError::BackendNotAvailable {
            backend: "localStorage".to_string(),
        };
        let window = web_sys::window().ok_or_else(unavailable)?;
        // Throws SecurityError when storage is disabled for the origin
        let storage = window
            .local_storage()
            .map_err(|_| unavailable())?
            .ok_or_else(unavailable)?;
        Ok(Self { storage })
    }
}

fn flat_error(operation: &str, error: JsValue) -> StorageError {
    match exception_name(&error).as_deref() {
        // Firefox used its own name before standardising on QuotaExceededError
        Some("QuotaExceededError") | Some("NS_ERROR_DOM_QUOTA_REACHED") => {
            StorageError::QuotaExceeded
        }
        _ => StorageError::OperationFailed {
            operation: operation.to_string(),
            reason: describe(&error),
        },
    }
}

impl FlatStorage for BrowserLocalStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| flat_error("get_item", e))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| flat_error("set_item", e))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| flat_error("remove_item", e))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::LocalStorage
    }
}
