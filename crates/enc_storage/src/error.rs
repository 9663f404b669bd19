//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the data directory lock.
    #[error("storage locked: another process has exclusive access to {path}")]
    Locked {
        /// The locked directory.
        path: String,
    },

    /// The data path exists but is not usable as a store directory.
    #[error("invalid data directory: {0}")]
    InvalidPath(String),
}
