//! Error types for the ENC store engine.

use crate::model::{RecordId, StoreId};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] enc_storage::StorageError),

    /// Snapshot or archive codec error.
    #[error("codec error: {0}")]
    Codec(#[from] enc_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The durable store cannot be opened, is locked, or cannot be decrypted.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// An archive is malformed or its payload cannot be decrypted.
    #[error("invalid archive: {message}")]
    InvalidArchive {
        /// Description of the problem.
        message: String,
    },

    /// An archive was written by an unknown format version.
    #[error("unsupported archive version {found}")]
    UnsupportedArchiveVersion {
        /// Version found in the manifest.
        found: u64,
    },

    /// Persisting in-memory state failed.
    #[error("flush failed: {message}")]
    FlushFailure {
        /// Description of the failure.
        message: String,
    },

    /// Store not found.
    #[error("store not found: {0}")]
    StoreNotFound(StoreId),

    /// Record not found.
    #[error("record not found: {record} in store {store}")]
    RecordNotFound {
        /// The store searched.
        store: StoreId,
        /// The record id that was not found.
        record: RecordId,
    },

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Decryption failed.
    #[error("decryption failed: {message}")]
    DecryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Invalid key size.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// Invalid snapshot format or version.
    #[error("invalid snapshot format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl CoreError {
    /// Creates a storage unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates an invalid archive error.
    pub fn invalid_archive(message: impl Into<String>) -> Self {
        Self::InvalidArchive {
            message: message.into(),
        }
    }

    /// Creates a flush failure error.
    pub fn flush_failure(message: impl Into<String>) -> Self {
        Self::FlushFailure {
            message: message.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a decryption failed error.
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid key size error.
    pub fn invalid_key_size(actual: usize, expected: usize) -> Self {
        Self::InvalidKeySize { expected, actual }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns `true` if the error refers to a missing store or record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::StoreNotFound(_) | Self::RecordNotFound { .. })
    }

    /// Maps an archive decoding error to the import error taxonomy.
    pub(crate) fn from_archive(err: enc_codec::CodecError) -> Self {
        match err {
            enc_codec::CodecError::UnsupportedVersion { found, .. } => {
                Self::UnsupportedArchiveVersion { found }
            }
            other => Self::invalid_archive(other.to_string()),
        }
    }
}
