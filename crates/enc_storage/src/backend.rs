//! Storage backend trait definition.

use crate::error::StorageResult;

/// A durable medium holding one opaque blob.
///
/// The engine owns the format of the blob; backends only load it, replace it
/// as a whole, and report its size.
///
/// # Invariants
///
/// - `load` returns `None` until the first successful `replace`
/// - `load` after `replace(data)` returns exactly `data`
/// - `replace` is atomic: a crash mid-call leaves the previous blob intact
/// - When `replace` returns `Ok`, the new blob survives process termination
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Loads the current blob, or `None` if nothing was ever stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read.
    fn load(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically replaces the stored blob with `data` and makes it durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the write, sync or rename fails. The previous
    /// blob is left untouched in that case.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Returns the size in bytes of the stored blob (0 when empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Returns a short human-readable description of where data lives.
    fn describe(&self) -> String;
}
