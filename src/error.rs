//! Error types for mmapkv
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::ValueKind;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for mmapkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create store file [{path}]: {source}")]
    Creation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to sync log region: {0}")]
    Sync(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported value type: store holds {expected}, got {found}")]
    UnsupportedType { expected: ValueKind, found: ValueKind },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Key too large: {0} bytes (max 65535)")]
    KeyTooLarge(usize),

    #[error("Value too large: {0} bytes (max 65535)")]
    ValueTooLarge(usize),

    #[error("Empty values cannot be stored (reserved for tombstones)")]
    EmptyValue,

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key [{0}] not found")]
    KeyNotFound(String),

    #[error("Key [{0}] was deleted")]
    KeyDeleted(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Log region capacity exceeded: need {required} bytes, capacity is {capacity}")]
    CapacityExceeded { required: u64, capacity: u64 },

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Concurrent modification: cursor moved from {expected} to {actual}")]
    ConcurrentModification { expected: u32, actual: u32 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
