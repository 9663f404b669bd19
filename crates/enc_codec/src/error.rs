//! Error types for codec operations.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR encoding or decoding failed.
    #[error("CBOR error: {0}")]
    Cbor(String),

    /// The archive manifest is not valid JSON.
    #[error("manifest error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading or writing a container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive is structurally invalid.
    #[error("invalid archive: {0}")]
    Invalid(String),

    /// The archive was written by an unknown format version.
    #[error("unsupported archive version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the manifest.
        found: u64,
        /// Version this build understands.
        supported: u16,
    },
}

impl CodecError {
    /// Creates an invalid archive error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
