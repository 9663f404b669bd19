//! Store engine facade.

use crate::config::Config;
use crate::crypto::Passphrase;
use crate::error::{CoreError, CoreResult};
use crate::model::{
    unix_millis, NewRecord, Record, RecordId, RecordMeta, RecordUpdate, Store, StoreId, StoreMeta,
};
use crate::snapshot::Sealer;
use enc_codec::ArchiveManifest;
use enc_storage::{FileBackend, StorageBackend};
use parking_lot::RwLock;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, IntoInnerError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Engine status summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    /// Number of stores.
    pub stores: usize,
    /// Total number of records across all stores.
    pub records: usize,
    /// Size of the persisted snapshot in bytes.
    pub size: u64,
    /// Whether there are changes not yet persisted.
    pub dirty: bool,
    /// Time of the last successful persist (Unix milliseconds).
    pub last_flush: Option<u64>,
    /// Description of the storage medium.
    pub storage: String,
}

/// A record whose expiry time has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredRecord {
    /// Owning store.
    pub store_id: StoreId,
    /// Display name of the owning store.
    pub store_title: String,
    /// Listing view of the record.
    pub record: RecordMeta,
}

enum Medium {
    /// A data directory not yet locked and opened.
    Unopened(PathBuf),
    /// An open backend.
    Open(Box<dyn StorageBackend>),
}

struct EngineState {
    medium: Medium,
    /// `None` until `setup` succeeds.
    sealer: Option<Sealer>,
    stores: Vec<Store>,
    dirty: bool,
    last_flush: Option<u64>,
}

impl EngineState {
    fn ensure_ready(&self) -> CoreResult<()> {
        if self.sealer.is_none() {
            return Err(CoreError::storage_unavailable("store has not been set up"));
        }
        Ok(())
    }

    fn backend(&self) -> CoreResult<&dyn StorageBackend> {
        match &self.medium {
            Medium::Open(backend) => Ok(backend.as_ref()),
            Medium::Unopened(dir) => Err(CoreError::storage_unavailable(format!(
                "data directory not opened: {}",
                dir.display()
            ))),
        }
    }

    fn describe(&self) -> String {
        match &self.medium {
            Medium::Open(backend) => backend.describe(),
            Medium::Unopened(dir) => dir.display().to_string(),
        }
    }

    /// Seals the current stores and atomically replaces the on-disk snapshot.
    fn persist(&mut self) -> CoreResult<()> {
        let Self {
            medium,
            sealer,
            stores,
            ..
        } = self;
        let (Some(sealer), Medium::Open(backend)) = (sealer.as_ref(), medium) else {
            return Err(CoreError::storage_unavailable("store has not been set up"));
        };

        let sealed = sealer
            .seal(stores)
            .map_err(|e| CoreError::flush_failure(e.to_string()))?;
        backend
            .replace(&sealed)
            .map_err(|e| CoreError::flush_failure(e.to_string()))?;

        self.dirty = false;
        self.last_flush = Some(unix_millis());
        debug!(bytes = sealed.len(), "snapshot persisted");
        Ok(())
    }
}

fn find_store(stores: &[Store], id: StoreId) -> CoreResult<&Store> {
    stores
        .iter()
        .find(|s| s.id == id)
        .ok_or(CoreError::StoreNotFound(id))
}

fn find_store_mut(stores: &mut [Store], id: StoreId) -> CoreResult<&mut Store> {
    stores
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or(CoreError::StoreNotFound(id))
}

fn record_not_found(store: StoreId, record: RecordId) -> CoreError {
    CoreError::RecordNotFound { store, record }
}

/// The encrypted secret store.
///
/// `StoreEngine` owns every [`Store`] and [`Record`]. Callers only ever
/// receive clones or listing views, never references into engine state.
///
/// # Concurrency
///
/// All state sits behind one engine-wide `RwLock`. Reads share the lock;
/// mutations, [`flush`](Self::flush), [`export`](Self::export) and
/// [`import`](Self::import) take it exclusively. An export therefore observes
/// a single consistent state and never interleaves with a write.
///
/// # Lifecycle
///
/// ```rust,ignore
/// use enc_core::{Config, Passphrase, StoreEngine};
///
/// let engine = StoreEngine::new("/var/lib/enc", Passphrase::new("..."), Config::default());
/// let is_new = engine.setup()?;
///
/// let store = engine.create_store("personal")?;
/// engine.flush()?;
/// ```
pub struct StoreEngine {
    config: Config,
    passphrase: Passphrase,
    state: RwLock<EngineState>,
}

impl StoreEngine {
    /// Creates an engine for a data directory.
    ///
    /// Nothing is touched on disk until [`setup`](Self::setup).
    pub fn new(dir: impl Into<PathBuf>, passphrase: Passphrase, config: Config) -> Self {
        Self::with_medium(Medium::Unopened(dir.into()), passphrase, config)
    }

    /// Creates an engine over an already opened backend.
    pub fn with_backend(
        backend: Box<dyn StorageBackend>,
        passphrase: Passphrase,
        config: Config,
    ) -> Self {
        Self::with_medium(Medium::Open(backend), passphrase, config)
    }

    /// Creates an engine for a data directory and sets it up.
    pub fn open(dir: impl Into<PathBuf>, passphrase: Passphrase, config: Config) -> CoreResult<Self> {
        let engine = Self::new(dir, passphrase, config);
        engine.setup()?;
        Ok(engine)
    }

    fn with_medium(medium: Medium, passphrase: Passphrase, config: Config) -> Self {
        Self {
            config,
            passphrase,
            state: RwLock::new(EngineState {
                medium,
                sealer: None,
                stores: Vec::new(),
                dirty: false,
                last_flush: None,
            }),
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `true` once [`setup`](Self::setup) has succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.read().sealer.is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Opens the durable store, creating an empty one if absent.
    ///
    /// Returns `true` if a new store was created. A new store is persisted
    /// immediately, which fixes its key derivation salt. Calling `setup` on a
    /// ready engine is a no-op returning `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the medium cannot be opened, is locked
    /// by another process, or cannot be decrypted with the passphrase.
    pub fn setup(&self) -> CoreResult<bool> {
        let mut state = self.state.write();
        if state.sealer.is_some() {
            return Ok(false);
        }

        if self.passphrase.is_empty() {
            return Err(CoreError::storage_unavailable("passphrase is empty"));
        }

        if let Medium::Unopened(dir) = &state.medium {
            let backend =
                FileBackend::open(dir).map_err(|e| CoreError::storage_unavailable(e.to_string()))?;
            state.medium = Medium::Open(Box::new(backend));
        }

        let existing = state
            .backend()?
            .load()
            .map_err(|e| CoreError::storage_unavailable(e.to_string()))?;

        let is_new = match existing {
            Some(sealed) => {
                let sealer = Sealer::for_sealed(&self.passphrase, &sealed).map_err(|e| {
                    CoreError::storage_unavailable(format!("unreadable snapshot: {e}"))
                })?;
                let snapshot = sealer.open(&sealed).map_err(|e| {
                    CoreError::storage_unavailable(format!(
                        "cannot decrypt snapshot (wrong passphrase?): {e}"
                    ))
                })?;

                state.stores = snapshot.stores;
                state.sealer = Some(sealer);
                state.dirty = false;
                false
            }
            None => {
                if !self.config.create_if_missing {
                    return Err(CoreError::storage_unavailable(
                        "store does not exist and create_if_missing is false",
                    ));
                }

                state.stores = Vec::new();
                state.sealer = Some(Sealer::create(&self.passphrase)?);
                if let Err(e) = state.persist() {
                    state.sealer = None;
                    return Err(CoreError::storage_unavailable(e.to_string()));
                }
                true
            }
        };

        info!(
            storage = %state.describe(),
            stores = state.stores.len(),
            is_new,
            "store ready"
        );
        Ok(is_new)
    }

    /// Durably persists in-memory state.
    ///
    /// A no-op when nothing changed since the last persist.
    ///
    /// # Errors
    ///
    /// Returns `FlushFailure` if sealing or writing fails. In-memory state is
    /// kept and the next flush retries.
    pub fn flush(&self) -> CoreResult<()> {
        let mut state = self.state.write();
        state.ensure_ready()?;

        if !state.dirty {
            debug!("flush skipped: no pending changes");
            return Ok(());
        }

        state.persist()?;
        info!("store flushed");
        Ok(())
    }

    /// Exports the store to an archive at `path`.
    ///
    /// Pending changes are persisted first; the archive payload is the
    /// on-disk snapshot, byte for byte. The archive is written to
    /// `<path>.tmp` and renamed into place, so `path` never holds a partial
    /// archive.
    pub fn export(&self, path: &Path) -> CoreResult<ArchiveManifest> {
        let mut state = self.state.write();
        state.ensure_ready()?;

        if state.dirty {
            state.persist()?;
        }

        let payload = state
            .backend()?
            .load()?
            .ok_or_else(|| CoreError::storage_unavailable("no snapshot on disk"))?;

        let manifest = write_archive_atomic(path, &payload)?;
        info!(path = %path.display(), size = manifest.size, "store exported");
        Ok(manifest)
    }

    /// Replaces the store with the contents of an archive.
    ///
    /// The archive is read, validated and fully decrypted before the engine
    /// lock is taken. Only then is the payload written to disk verbatim and
    /// in-memory state swapped. On any error existing data is unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidArchive` if the container is malformed or the payload cannot
    ///   be decrypted with this engine's passphrase
    /// - `UnsupportedArchiveVersion` if the manifest version is unknown
    pub fn import(&self, path: &Path) -> CoreResult<()> {
        let file = File::open(path)?;
        let (manifest, payload) =
            enc_codec::read_archive(BufReader::new(file)).map_err(CoreError::from_archive)?;

        let sealer = Sealer::for_sealed(&self.passphrase, &payload)
            .map_err(|e| CoreError::invalid_archive(format!("payload header: {e}")))?;
        let snapshot = sealer
            .open(&payload)
            .map_err(|e| CoreError::invalid_archive(format!("payload cannot be opened: {e}")))?;

        let mut state = self.state.write();
        state.ensure_ready()?;

        if state.dirty {
            warn!("import discards changes that were never flushed");
        }

        match &mut state.medium {
            Medium::Open(backend) => backend.replace(&payload)?,
            Medium::Unopened(_) => {
                return Err(CoreError::storage_unavailable("store has not been set up"))
            }
        }

        state.stores = snapshot.stores;
        state.sealer = Some(sealer);
        state.dirty = false;
        state.last_flush = Some(unix_millis());

        info!(
            path = %path.display(),
            size = manifest.size,
            stores = state.stores.len(),
            "store imported"
        );
        Ok(())
    }

    /// Byte size of the persisted snapshot.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.state.read().backend()?.size()?)
    }

    /// Returns a status summary.
    pub fn status(&self) -> CoreResult<EngineStatus> {
        let state = self.state.read();
        state.ensure_ready()?;

        Ok(EngineStatus {
            stores: state.stores.len(),
            records: state.stores.iter().map(|s| s.records.len()).sum(),
            size: state.backend()?.size()?,
            dirty: state.dirty,
            last_flush: state.last_flush,
            storage: state.describe(),
        })
    }

    // ========================================================================
    // Access helpers
    // ========================================================================

    fn read<T>(&self, f: impl FnOnce(&[Store]) -> CoreResult<T>) -> CoreResult<T> {
        let state = self.state.read();
        state.ensure_ready()?;
        f(state.stores.as_slice())
    }

    /// Applies a mutation under the write lock.
    ///
    /// The engine is only marked dirty if `f` succeeds. With `sync_on_write`,
    /// a mutation whose persist fails is rolled back, so a write reported as
    /// failed is never flushed later.
    fn write<T>(&self, f: impl FnOnce(&mut Vec<Store>, u64) -> CoreResult<T>) -> CoreResult<T> {
        let mut state = self.state.write();
        state.ensure_ready()?;

        let undo = self
            .config
            .sync_on_write
            .then(|| (state.stores.clone(), state.dirty));

        let out = f(&mut state.stores, unix_millis())?;
        state.dirty = true;

        if let Some((stores, dirty)) = undo {
            if let Err(e) = state.persist() {
                state.stores = stores;
                state.dirty = dirty;
                warn!(error = %e, "write rolled back: snapshot could not be persisted");
                return Err(e);
            }
        }
        Ok(out)
    }

    // ========================================================================
    // Stores
    // ========================================================================

    /// Lists all stores.
    pub fn list_stores(&self) -> CoreResult<Vec<StoreMeta>> {
        self.read(|stores| Ok(stores.iter().map(Store::meta).collect()))
    }

    /// Creates an empty store.
    pub fn create_store(&self, title: impl Into<String>) -> CoreResult<Store> {
        let title = title.into();
        let store = self.write(|stores, now| {
            let store = Store::new(title, now);
            stores.push(store.clone());
            Ok(store)
        })?;
        debug!(store = %store.id, "store created");
        Ok(store)
    }

    /// Returns a store with all its records.
    pub fn get_store(&self, id: StoreId) -> CoreResult<Store> {
        self.read(|stores| find_store(stores, id).cloned())
    }

    /// Renames a store.
    pub fn update_store(&self, id: StoreId, title: impl Into<String>) -> CoreResult<StoreMeta> {
        let title = title.into();
        self.write(|stores, now| {
            let store = find_store_mut(stores, id)?;
            store.title = title;
            store.updated_at = now;
            Ok(store.meta())
        })
    }

    /// Deletes a store and all of its records.
    pub fn delete_store(&self, id: StoreId) -> CoreResult<StoreMeta> {
        let removed = self.write(|stores, _| {
            let index = stores
                .iter()
                .position(|s| s.id == id)
                .ok_or(CoreError::StoreNotFound(id))?;
            Ok(stores.remove(index).meta())
        })?;
        debug!(store = %id, records = removed.records, "store deleted");
        Ok(removed)
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Lists the records of a store.
    pub fn list_records(&self, store: StoreId) -> CoreResult<Vec<RecordMeta>> {
        self.read(|stores| {
            Ok(find_store(stores, store)?
                .records
                .iter()
                .map(Record::meta)
                .collect())
        })
    }

    /// Adds a record to a store.
    pub fn create_record(&self, store: StoreId, input: NewRecord) -> CoreResult<Record> {
        self.write(|stores, now| {
            let owner = find_store_mut(stores, store)?;
            let record = Record::new(input, now);
            owner.records.push(record.clone());
            owner.updated_at = now;
            Ok(record)
        })
    }

    /// Returns a record.
    pub fn get_record(&self, store: StoreId, record: RecordId) -> CoreResult<Record> {
        self.read(|stores| {
            find_store(stores, store)?
                .record(record)
                .cloned()
                .ok_or_else(|| record_not_found(store, record))
        })
    }

    /// Applies a partial update to a record.
    pub fn update_record(
        &self,
        store: StoreId,
        record: RecordId,
        update: RecordUpdate,
    ) -> CoreResult<Record> {
        self.write(|stores, now| {
            let owner = find_store_mut(stores, store)?;
            let target = owner
                .record_mut(record)
                .ok_or_else(|| record_not_found(store, record))?;
            target.apply(update, now);
            let updated = target.clone();
            owner.updated_at = now;
            Ok(updated)
        })
    }

    /// Removes a record from its store.
    pub fn delete_record(&self, store: StoreId, record: RecordId) -> CoreResult<RecordMeta> {
        self.write(|stores, now| {
            let owner = find_store_mut(stores, store)?;
            let index = owner
                .records
                .iter()
                .position(|r| r.id == record)
                .ok_or_else(|| record_not_found(store, record))?;
            let removed = owner.records.remove(index);
            owner.updated_at = now;
            Ok(removed.meta())
        })
    }

    /// Returns the binary attachment of a record, if it has one.
    pub fn record_buffer(&self, store: StoreId, record: RecordId) -> CoreResult<Option<Vec<u8>>> {
        self.read(|stores| {
            find_store(stores, store)?
                .record(record)
                .map(|r| r.buffer.clone())
                .ok_or_else(|| record_not_found(store, record))
        })
    }

    /// Returns every record whose expiry time is at or before `now`.
    pub fn expired_records(&self, now: u64) -> CoreResult<Vec<ExpiredRecord>> {
        self.read(|stores| {
            Ok(stores
                .iter()
                .flat_map(|store| {
                    store
                        .records
                        .iter()
                        .filter(move |r| r.is_expired(now))
                        .map(move |r| ExpiredRecord {
                            store_id: store.id,
                            store_title: store.title.clone(),
                            record: r.meta(),
                        })
                })
                .collect())
        })
    }
}

impl std::fmt::Debug for StoreEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("StoreEngine")
            .field("storage", &state.describe())
            .field("ready", &state.sealer.is_some())
            .field("stores", &state.stores.len())
            .field("dirty", &state.dirty)
            .finish()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes an archive to `<path>.tmp`, syncs it, and renames it over `path`.
fn write_archive_atomic(path: &Path, payload: &[u8]) -> CoreResult<ArchiveManifest> {
    let temp = temp_path(path);
    let result = write_archive_file(&temp, payload).and_then(|manifest| {
        fs::rename(&temp, path)?;
        Ok(manifest)
    });

    if result.is_err() && temp.exists() {
        if let Err(e) = fs::remove_file(&temp) {
            warn!(path = %temp.display(), error = %e, "failed to remove partial archive");
        }
    }
    result
}

fn write_archive_file(path: &Path, payload: &[u8]) -> CoreResult<ArchiveManifest> {
    let mut writer = BufWriter::new(File::create(path)?);
    let manifest = enc_codec::write_archive(&mut writer, payload, unix_millis())?;
    let file = writer.into_inner().map_err(IntoInnerError::into_error)?;
    file.sync_all()?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enc_storage::InMemoryBackend;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn engine_on(backend: &InMemoryBackend, config: Config) -> StoreEngine {
        StoreEngine::with_backend(Box::new(backend.clone()), Passphrase::new("pw"), config)
    }

    fn ready_engine(config: Config) -> (StoreEngine, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        let engine = engine_on(&backend, config);
        assert!(engine.setup().unwrap());
        (engine, backend)
    }

    #[test]
    fn setup_creates_and_persists_empty_store() {
        let (engine, backend) = ready_engine(Config::default());

        assert!(engine.is_ready());
        assert_eq!(backend.replace_count(), 1);
        assert!(engine.size().unwrap() > 0);
        assert!(engine.list_stores().unwrap().is_empty());
    }

    #[test]
    fn setup_is_idempotent() {
        let (engine, backend) = ready_engine(Config::default());
        assert!(!engine.setup().unwrap());
        assert_eq!(backend.replace_count(), 1);
    }

    #[test]
    fn reopen_loads_existing_store() {
        let (engine, backend) = ready_engine(Config::default());
        let store = engine.create_store("personal").unwrap();
        drop(engine);

        let reopened = engine_on(&backend, Config::default());
        assert!(!reopened.setup().unwrap());
        assert_eq!(reopened.get_store(store.id).unwrap().title, "personal");
    }

    #[test]
    fn wrong_passphrase_is_unavailable() {
        let (engine, backend) = ready_engine(Config::default());
        drop(engine);

        let other =
            StoreEngine::with_backend(Box::new(backend), Passphrase::new("nope"), Config::default());
        assert!(matches!(
            other.setup(),
            Err(CoreError::StorageUnavailable { .. })
        ));
        assert!(!other.is_ready());
    }

    #[test]
    fn corrupted_snapshot_is_unavailable() {
        let backend = InMemoryBackend::with_data(b"definitely not a snapshot".to_vec());
        let engine = engine_on(&backend, Config::default());
        assert!(matches!(
            engine.setup(),
            Err(CoreError::StorageUnavailable { .. })
        ));
    }

    #[test]
    fn missing_store_without_create_fails() {
        let backend = InMemoryBackend::new();
        let engine = engine_on(&backend, Config::new().create_if_missing(false));
        assert!(matches!(
            engine.setup(),
            Err(CoreError::StorageUnavailable { .. })
        ));
        assert_eq!(backend.replace_count(), 0);
    }

    #[test]
    fn empty_passphrase_rejected() {
        let engine = StoreEngine::with_backend(
            Box::new(InMemoryBackend::new()),
            Passphrase::new(""),
            Config::default(),
        );
        assert!(engine.setup().is_err());
    }

    #[test]
    fn operations_require_setup() {
        let engine = engine_on(&InMemoryBackend::new(), Config::default());
        assert!(matches!(
            engine.create_store("x"),
            Err(CoreError::StorageUnavailable { .. })
        ));
        assert!(engine.list_stores().is_err());
        assert!(engine.flush().is_err());
    }

    #[test]
    fn locked_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let first = StoreEngine::open(dir.path(), Passphrase::new("pw"), Config::default()).unwrap();

        let second = StoreEngine::new(dir.path(), Passphrase::new("pw"), Config::default());
        assert!(matches!(
            second.setup(),
            Err(CoreError::StorageUnavailable { .. })
        ));
        drop(first);
        assert!(!second.setup().unwrap());
    }

    #[test]
    fn flush_is_idempotent() {
        let (engine, backend) = ready_engine(Config::new().sync_on_write(false));
        engine.create_store("a").unwrap();
        assert_eq!(backend.replace_count(), 1);
        assert!(engine.status().unwrap().dirty);

        engine.flush().unwrap();
        assert_eq!(backend.replace_count(), 2);
        assert!(!engine.status().unwrap().dirty);

        engine.flush().unwrap();
        engine.flush().unwrap();
        assert_eq!(backend.replace_count(), 2);
    }

    #[test]
    fn sync_on_write_persists_each_mutation() {
        let (engine, backend) = ready_engine(Config::default());
        let store = engine.create_store("a").unwrap();
        engine
            .create_record(store.id, NewRecord::new("note", "n", vec![1]))
            .unwrap();

        assert_eq!(backend.replace_count(), 3);
        assert!(!engine.status().unwrap().dirty);
    }

    #[test]
    fn failed_mutation_does_not_dirty() {
        let (engine, backend) = ready_engine(Config::new().sync_on_write(false));
        assert!(engine.update_store(StoreId::new(), "x").is_err());
        assert!(!engine.status().unwrap().dirty);
        engine.flush().unwrap();
        assert_eq!(backend.replace_count(), 1);
    }

    #[test]
    fn store_crud() {
        let (engine, _) = ready_engine(Config::default());
        let store = engine.create_store("personal").unwrap();

        let renamed = engine.update_store(store.id, "private").unwrap();
        assert_eq!(renamed.title, "private");
        assert!(renamed.updated_at >= store.updated_at);

        let listed = engine.list_stores().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "private");

        engine.delete_store(store.id).unwrap();
        assert!(matches!(
            engine.get_store(store.id),
            Err(CoreError::StoreNotFound(id)) if id == store.id
        ));
        assert!(engine.delete_store(store.id).is_err());
    }

    #[test]
    fn record_crud() {
        let (engine, _) = ready_engine(Config::default());
        let store = engine.create_store("personal").unwrap();

        let record = engine
            .create_record(
                store.id,
                NewRecord::new("password", "bank", b"ciphertext".to_vec())
                    .with_encryption("aes-gcm")
                    .with_buffer(vec![9; 32]),
            )
            .unwrap();

        let fetched = engine.get_record(store.id, record.id).unwrap();
        assert_eq!(fetched, record);
        assert_eq!(fetched.value, b"ciphertext");

        let metas = engine.list_records(store.id).unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].size, 10);
        assert_eq!(metas[0].buffer_size, Some(32));

        let updated = engine
            .update_record(
                store.id,
                record.id,
                RecordUpdate {
                    title: Some("bank (old)".into()),
                    pinned: Some(true),
                    ..RecordUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "bank (old)");
        assert!(updated.pinned);
        assert_eq!(updated.value, b"ciphertext");

        assert_eq!(
            engine.record_buffer(store.id, record.id).unwrap(),
            Some(vec![9; 32])
        );

        engine.delete_record(store.id, record.id).unwrap();
        assert!(matches!(
            engine.get_record(store.id, record.id),
            Err(CoreError::RecordNotFound { .. })
        ));
        assert!(engine.list_records(store.id).unwrap().is_empty());
    }

    #[test]
    fn record_ops_on_missing_store() {
        let (engine, _) = ready_engine(Config::default());
        let missing = StoreId::new();
        assert!(matches!(
            engine.create_record(missing, NewRecord::default()),
            Err(CoreError::StoreNotFound(_))
        ));
        assert!(matches!(
            engine.list_records(missing),
            Err(CoreError::StoreNotFound(_))
        ));
    }

    #[test]
    fn deleting_store_cascades() {
        let (engine, _) = ready_engine(Config::default());
        let store = engine.create_store("s").unwrap();
        for i in 0..3 {
            engine
                .create_record(store.id, NewRecord::new("note", i.to_string(), vec![]))
                .unwrap();
        }

        let removed = engine.delete_store(store.id).unwrap();
        assert_eq!(removed.records, 3);
        assert_eq!(engine.status().unwrap().records, 0);
    }

    #[test]
    fn record_mutations_touch_store() {
        let (engine, _) = ready_engine(Config::default());
        let store = engine.create_store("s").unwrap();
        let record = engine
            .create_record(store.id, NewRecord::new("note", "n", vec![]))
            .unwrap();

        let after = engine.get_store(store.id).unwrap();
        assert!(after.updated_at >= record.created_at);
    }

    #[test]
    fn expired_records_are_reported() {
        let (engine, _) = ready_engine(Config::default());
        let store = engine.create_store("s").unwrap();
        let old = engine
            .create_record(store.id, NewRecord::new("password", "old", vec![]).expires_at(1_000))
            .unwrap();
        engine
            .create_record(store.id, NewRecord::new("password", "new", vec![]).expires_at(9_000))
            .unwrap();
        engine
            .create_record(store.id, NewRecord::new("note", "forever", vec![]))
            .unwrap();

        let expired = engine.expired_records(5_000).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].record.id, old.id);
        assert_eq!(expired[0].store_id, store.id);
        assert_eq!(expired[0].store_title, "s");

        assert_eq!(engine.expired_records(9_000).unwrap().len(), 2);
    }

    #[test]
    fn concurrent_writers_are_serialized() {
        let (engine, _) = ready_engine(Config::new().sync_on_write(false));
        let engine = Arc::new(engine);
        let store = engine.create_store("shared").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        engine
                            .create_record(
                                store.id,
                                NewRecord::new("note", format!("{t}-{i}"), vec![t as u8]),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.list_records(store.id).unwrap().len(), 200);
        engine.flush().unwrap();
    }

    #[test]
    fn status_counts() {
        let (engine, _) = ready_engine(Config::default());
        let a = engine.create_store("a").unwrap();
        engine.create_store("b").unwrap();
        engine
            .create_record(a.id, NewRecord::new("note", "n", vec![]))
            .unwrap();

        let status = engine.status().unwrap();
        assert_eq!(status.stores, 2);
        assert_eq!(status.records, 1);
        assert_eq!(status.storage, "memory");
        assert!(status.last_flush.is_some());
        assert_eq!(status.size, engine.size().unwrap());
    }

    /// Memory backend whose `replace` can be switched to fail.
    struct FailingBackend {
        inner: InMemoryBackend,
        fail_replace: Arc<AtomicBool>,
    }

    impl StorageBackend for FailingBackend {
        fn load(&self) -> enc_storage::StorageResult<Option<Vec<u8>>> {
            self.inner.load()
        }

        fn replace(&mut self, data: &[u8]) -> enc_storage::StorageResult<()> {
            if self.fail_replace.load(Ordering::SeqCst) {
                return Err(enc_storage::StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "simulated write failure",
                )));
            }
            self.inner.replace(data)
        }

        fn size(&self) -> enc_storage::StorageResult<u64> {
            self.inner.size()
        }

        fn describe(&self) -> String {
            "failing memory".to_string()
        }
    }

    fn failing_engine() -> (StoreEngine, InMemoryBackend, Arc<AtomicBool>) {
        let inner = InMemoryBackend::new();
        let fail_replace = Arc::new(AtomicBool::new(false));
        let backend = FailingBackend {
            inner: inner.clone(),
            fail_replace: Arc::clone(&fail_replace),
        };
        let engine =
            StoreEngine::with_backend(Box::new(backend), Passphrase::new("pw"), Config::default());
        engine.setup().unwrap();
        (engine, inner, fail_replace)
    }

    #[test]
    fn write_that_cannot_persist_is_rolled_back() {
        let (engine, inner, fail_replace) = failing_engine();
        let kept = engine.create_store("kept").unwrap();
        let writes = inner.replace_count();

        fail_replace.store(true, Ordering::SeqCst);
        assert!(matches!(
            engine.create_store("lost"),
            Err(CoreError::FlushFailure { .. })
        ));
        assert!(engine
            .create_record(kept.id, NewRecord::new("note", "n", vec![1]))
            .is_err());
        assert!(engine.delete_store(kept.id).is_err());

        let stores = engine.list_stores().unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].title, "kept");
        assert!(engine.list_records(kept.id).unwrap().is_empty());
        assert!(!engine.status().unwrap().dirty);

        // Nothing rejected earlier reaches disk once writes work again.
        fail_replace.store(false, Ordering::SeqCst);
        engine.flush().unwrap();
        assert_eq!(inner.replace_count(), writes);

        drop(engine);
        let reopened = engine_on(&inner, Config::default());
        reopened.setup().unwrap();
        let titles: Vec<_> = reopened
            .list_stores()
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["kept"]);
    }

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/tmp/enc.tar")),
            PathBuf::from("/tmp/enc.tar.tmp")
        );
    }
}
