//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Shared {
    blob: RwLock<Option<Vec<u8>>>,
    replaces: AtomicUsize,
}

/// An in-memory storage backend.
///
/// Clones share the same underlying blob, which lets tests "restart" an
/// engine: drop it, then open a new one on a clone of the same backend.
///
/// # Example
///
/// ```rust
/// use enc_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let reopened = backend.clone();
/// backend.replace(b"data").unwrap();
/// assert_eq!(reopened.load().unwrap().unwrap(), b"data");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `data`.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        let backend = Self::default();
        *backend.shared.blob.write() = Some(data);
        backend
    }

    /// Number of successful `replace` calls across all clones.
    #[must_use]
    pub fn replace_count(&self) -> usize {
        self.shared.replaces.load(Ordering::SeqCst)
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.shared.blob.read().clone())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        *self.shared.blob.write() = Some(data.to_vec());
        self.shared.replaces.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self
            .shared
            .blob
            .read()
            .as_ref()
            .map_or(0, |b| b.len() as u64))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
