//! Test fixtures and engine helpers.
//!
//! Provides ready-to-use engines backed by a temporary directory or by
//! memory, plus a small populated data set.

use enc_core::{Config, NewRecord, Passphrase, Record, Store, StoreEngine};
use enc_storage::InMemoryBackend;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Passphrase used by every fixture.
pub const TEST_PASSPHRASE: &str = "correct horse battery staple";

/// A set-up engine with automatic cleanup.
pub struct TestEngine {
    /// The engine instance.
    pub engine: StoreEngine,
    /// In-memory backend handle, if memory-based.
    memory: Option<InMemoryBackend>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestEngine {
    /// Creates an engine over a shared in-memory backend.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an in-memory engine with a custom configuration.
    pub fn memory_with(config: Config) -> Self {
        let backend = InMemoryBackend::new();
        let engine = StoreEngine::with_backend(
            Box::new(backend.clone()),
            Passphrase::new(TEST_PASSPHRASE),
            config,
        );
        engine.setup().expect("Failed to set up in-memory engine");
        Self {
            engine,
            memory: Some(backend),
            temp_dir: None,
        }
    }

    /// Creates an engine over a temporary data directory.
    pub fn file() -> Self {
        Self::file_with(Config::default())
    }

    /// Creates a file engine with a custom configuration.
    pub fn file_with(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let engine = open_engine(temp_dir.path(), config);
        Self {
            engine,
            memory: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the data directory if file-based.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Number of snapshot writes, if memory-based.
    pub fn persist_count(&self) -> Option<usize> {
        self.memory.as_ref().map(InMemoryBackend::replace_count)
    }

    /// Drops the engine, releasing its directory lock, and returns the
    /// directory if file-based.
    pub fn into_dir(self) -> Option<TempDir> {
        let Self {
            engine, temp_dir, ..
        } = self;
        drop(engine);
        temp_dir
    }

    /// Drops the engine and opens the same data directory again.
    ///
    /// # Panics
    ///
    /// Panics for memory-based engines.
    pub fn reopen(self) -> Self {
        let Self {
            engine,
            temp_dir,
            ..
        } = self;
        let config = engine.config().clone();
        drop(engine);

        let temp_dir = temp_dir.expect("reopen requires a file-based engine");
        let engine = open_engine(temp_dir.path(), config);
        Self {
            engine,
            memory: None,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestEngine {
    type Target = StoreEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// Opens (or creates) an engine in `dir` with the test passphrase.
pub fn open_engine(dir: &Path, config: Config) -> StoreEngine {
    StoreEngine::open(dir, Passphrase::new(TEST_PASSPHRASE), config)
        .expect("Failed to open engine")
}

/// A temporary directory to write archives into.
pub struct ArchiveDir {
    dir: TempDir,
}

impl ArchiveDir {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path of a file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// The directory itself.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for ArchiveDir {
    fn default() -> Self {
        Self::new()
    }
}

/// What [`populate`] created.
#[derive(Debug, Clone)]
pub struct SampleData {
    /// Created stores, in creation order.
    pub stores: Vec<Store>,
    /// Created records, in creation order.
    pub records: Vec<Record>,
}

/// Creates two stores with a few records of different kinds.
pub fn populate(engine: &StoreEngine) -> SampleData {
    let personal = engine.create_store("personal").expect("create store");
    let work = engine.create_store("work").expect("create store");

    let inputs = [
        (
            &personal,
            NewRecord::new("password", "bank", b"sealed:bank".to_vec()).with_encryption("aes"),
        ),
        (
            &personal,
            NewRecord::new("file", "passport.pdf", b"sealed:scan".to_vec())
                .with_buffer(vec![0x25, 0x50, 0x44, 0x46])
                .pinned(true),
        ),
        (
            &work,
            NewRecord::new("note", "vpn", b"sealed:vpn".to_vec()).expires_at(1),
        ),
    ];

    let records = inputs
        .into_iter()
        .map(|(store, input)| engine.create_record(store.id, input).expect("create record"))
        .collect();

    let stores = vec![
        engine.get_store(personal.id).expect("get store"),
        engine.get_store(work.id).expect("get store"),
    ];

    SampleData { stores, records }
}
