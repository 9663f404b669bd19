//! Directory-based storage backend for persistent storage.
//!
//! Layout of a data directory:
//!
//! ```text
//! <data_dir>/
//! ├─ LOCK            # Advisory lock for single-process access
//! ├─ store.enc       # Current sealed snapshot
//! └─ store.enc.tmp   # Only present while a replace is in progress
//! ```

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the sealed snapshot file inside the data directory.
pub const DATA_FILE: &str = "store.enc";
/// Name of the advisory lock file inside the data directory.
pub const LOCK_FILE: &str = "LOCK";
/// Temporary file used for atomic replacement.
const DATA_TEMP: &str = "store.enc.tmp";

/// A directory-based storage backend.
///
/// The backend holds an exclusive advisory lock on `<dir>/LOCK` for its whole
/// lifetime, so two processes can never write the same store.
///
/// # Durability
///
/// `replace` uses the write-then-rename pattern:
/// 1. Write to `store.enc.tmp`
/// 2. `sync_all` the temporary file
/// 3. Rename over `store.enc`
/// 4. Fsync the directory so the rename itself is durable
///
/// # Example
///
/// ```no_run
/// use enc_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("/var/lib/enc")).unwrap();
/// backend.replace(b"sealed").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    _lock_file: File,
}

impl FileBackend {
    /// Opens or creates a data directory and acquires its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path exists but is not a directory
    /// - Another process holds the lock (`Locked`)
    /// - I/O errors occur
    pub fn open(dir: &Path) -> StorageResult<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        if !dir.is_dir() {
            return Err(StorageError::InvalidPath(format!(
                "path is not a directory: {}",
                dir.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: dir.display().to_string(),
            });
        }

        // A leftover temp file means a replace was interrupted; the old
        // snapshot is still authoritative.
        let temp = dir.join(DATA_TEMP);
        if temp.exists() {
            warn!(path = %temp.display(), "removing stale snapshot temp file");
            fs::remove_file(&temp)?;
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the sealed snapshot file.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        let dir = File::open(&self.dir)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        let path = self.data_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp_path = self.dir.join(DATA_TEMP);

        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.data_path())?;
        self.sync_directory()?;

        debug!(bytes = data.len(), dir = %self.dir.display(), "snapshot replaced");
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        match fs::metadata(self.data_path()) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
