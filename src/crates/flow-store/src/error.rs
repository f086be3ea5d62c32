//! Error types for value store operations

use thiserror::Error;

/// Result type for value store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while binding, reading or writing the value store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying file I/O failed (open, rename, create temp file, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be parsed as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A location was read before a successful `bind`
    #[error("no location bound")]
    Unbound,

    /// The document at a location does not match the `{ node_id: { fingerprint, value } }`
    /// layout guaranteed by the persistence format
    #[error("corrupt value store document at {0}: {1}")]
    Corrupt(String, String),
}
