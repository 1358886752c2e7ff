//! Error types for the QR app storage helpers
//!
//! This module provides a unified error handling system using `thiserror` for
//! both storage adapters and their host engines.

use thiserror::Error;

/// The main error type for the storage helpers
#[derive(Error, Debug)]
pub enum Error {
    /// Serialization/deserialization errors
    #[error("Serializer error: {0}")]
    Serializer(#[from] SerializerError),

    /// Storage operation errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },
}

/// Serializer-specific error types
#[derive(Error, Debug)]
pub enum SerializerError {
    /// Serialization failed
    #[error("Serialization failed: {reason}")]
    SerializationFailed {
        /// Underlying serializer message
        reason: String,
    },

    /// Deserialization failed
    #[error("Deserialization failed: {reason}")]
    DeserializationFailed {
        /// Underlying deserializer message
        reason: String,
    },
}

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Storage backend not available in this host
    #[error("Storage backend not available: {backend}")]
    BackendNotAvailable {
        /// Name of the missing facility
        backend: String,
    },

    /// Opening the database failed
    #[error("Failed to open database {database}: {reason}")]
    Open {
        /// Database name
        database: String,
        /// Host-reported reason
        reason: String,
    },

    /// The stored database is newer than the requested version
    #[error("Database version mismatch: requested {requested}, existing {existing}")]
    VersionMismatch {
        /// Version passed to open
        requested: u32,
        /// Version already on disk
        existing: u32,
    },

    /// A schema upgrade step failed
    #[error("Schema upgrade to version {version} failed: {reason}")]
    Upgrade {
        /// Target version of the failing step
        version: u32,
        /// Why the step failed
        reason: String,
    },

    /// A read or write transaction did not complete
    #[error("Transaction failed: {operation}: {reason}")]
    Transaction {
        /// Operation that issued the transaction
        operation: String,
        /// Host-reported reason
        reason: String,
    },

    /// The connection was closed by its owner or by the host
    #[error("Connection to {database} is closed")]
    ConnectionClosed {
        /// Database name
        database: String,
    },

    /// The named record store does not exist in the open database
    #[error("Object store not found: {store}")]
    StoreNotFound {
        /// Store name
        store: String,
    },

    /// Storage quota exceeded
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// Storage operation failed
    #[error("Storage operation failed: {operation}: {reason}")]
    OperationFailed {
        /// Operation that failed
        operation: String,
        /// Host-reported reason
        reason: String,
    },
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience type alias for Serializer Results
pub type SerializerResult<T> = std::result::Result<T, SerializerError>;

/// Convenience type alias for Storage Results
pub type StorageResult<T> = std::result::Result<T, StorageError>;
