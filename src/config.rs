//! Store configuration

use crate::error::{Error, Result};
use crate::storage::constants;
use crate::storage::engine::DatabaseSchema;
use serde::{Deserialize, Serialize};

/// How the embedded-store adapter holds its database handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    /// Open once on first use and share the handle between all calls
    #[default]
    Shared,
    /// Open a fresh handle for every operation and close it afterwards
    PerOperation,
}

/// Configuration for the embedded-store adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the database
    pub database_name: String,
    /// Name of the single record store inside the database
    pub store_name: String,
    /// Schema version the database is opened at
    pub version: u32,
    /// Connection handling
    pub connection_policy: ConnectionPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_name: constants::DB_NAME.to_string(),
            store_name: constants::STORE_NAME.to_string(),
            version: constants::DB_VERSION,
            connection_policy: ConnectionPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from JSON, filling omitted fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Configuration {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to open a database
    pub fn validate(&self) -> Result<()> {
        if self.database_name.is_empty() {
            return Err(Error::Configuration {
                message: "database name cannot be empty".to_string(),
            });
        }
        if self.store_name.is_empty() {
            return Err(Error::Configuration {
                message: "store name cannot be empty".to_string(),
            });
        }
        // IndexedDB rejects version 0 with a TypeError
        if self.version == 0 {
            return Err(Error::Configuration {
                message: "version must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Schema described by this configuration
    pub fn schema(&self) -> DatabaseSchema {
        DatabaseSchema {
            name: self.database_name.clone(),
            version: self.version,
            store: self.store_name.clone(),
        }
    }
}
