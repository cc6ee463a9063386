//! Error types for sobstore
//!
//! Provides a unified error type for all store operations.

use thiserror::Error;

/// Result type alias using SobError
pub type Result<T> = std::result::Result<T, SobError>;

/// Unified error type for sobstore operations
#[derive(Debug, Error)]
pub enum SobError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Item Size Errors
    // -------------------------------------------------------------------------
    #[error("Item size required: no itemsize configured for this store")]
    ItemSizeRequired,

    #[error("Item size cannot be changed once records exist")]
    ImmutableItemSize,

    #[error("Record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSizeMismatch { expected: u64, actual: u64 },

    #[error("File size {file_size} is not a multiple of itemsize {itemsize}")]
    SizeMismatch { file_size: u64, itemsize: u64 },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Index {index} out of range for length {length}")]
    IndexOutOfRange { index: u64, length: u64 },

    #[error("Record not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Mode / Mutation Errors
    // -------------------------------------------------------------------------
    #[error("Store is opened read-only")]
    ReadOnlyViolation,

    #[error("Sort failed: {0}")]
    SortFailed(#[source] Box<SobError>),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
