//! # QR App Storage
//!
//! Key-value persistence helpers for a browser client: an asynchronous
//! adapter over an embedded object store (IndexedDB) and a synchronous
//! adapter over flat string storage (localStorage).
//!
//! ## Features
//!
//! - **Storage Module**: the two adapters, their host traits and in-memory engines
//! - **Serializer Module**: JSON conversion of stored values
//! - **Config Module**: database/store naming and connection handling
//!
//! ## Optional Features
//!
//! - `wasm`: IndexedDB and localStorage engines via `web-sys`
//!
//! ## Example
//!
//! ```rust
//! use qr_app_storage::prelude::*;
//!
//! let store = LocalStore::new(MemoryFlatStorage::new());
//! store.set("last_scan", "https://example.com")?;
//! let url: Option<String> = store.get("last_scan")?;
//! assert_eq!(url.as_deref(), Some("https://example.com"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core error types
pub use error::{Error, Result};

// Core modules
pub mod config;
pub mod error;
pub mod serializer;
pub mod storage;

// Re-export commonly used types
pub mod prelude {
    //! Common types and traits for convenient importing

    pub use crate::config::{ConnectionPolicy, StoreConfig};
    pub use crate::error::{Error, Result, SerializerError, StorageError};
    pub use crate::storage::{
        AsyncKeyValueStore, IdbStore, KeyValueStoreSync, LocalStore, MemoryEngine,
        MemoryFlatStorage, StorageBackend,
    };

    #[cfg(feature = "wasm")]
    pub use crate::storage::{BrowserLocalStorage, IndexedDbEngine};
}

// Version information
/// The version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

/// Install a `tracing` subscriber that logs to stdout, filtered by `RUST_LOG`
/// (default `info`). Does nothing if a subscriber is already installed.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
