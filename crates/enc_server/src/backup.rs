//! Periodic archive backups with retention.

use crate::context::ServerContext;
use crate::error::{ServerError, ServerResult};
use crate::scheduler::ScheduledTask;
use async_trait::async_trait;
use enc_core::{unix_millis, StoreEngine};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const BACKUP_PREFIX: &str = "enc-backup-";
const BACKUP_SUFFIX: &str = ".tar";

/// Exports the store into a folder and keeps only the newest `run` archives.
#[derive(Debug, Clone)]
pub struct BackupService {
    folder: PathBuf,
    run: usize,
}

impl BackupService {
    /// Creates a backup task. A `run` of zero is treated as one.
    pub fn new(folder: impl Into<PathBuf>, run: usize) -> Self {
        Self {
            folder: folder.into(),
            run: run.max(1),
        }
    }

    /// Backup folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Number of archives kept.
    pub fn retention(&self) -> usize {
        self.run
    }

    /// Lists backup archives in the folder, oldest first.
    pub fn archives(&self) -> ServerResult<Vec<PathBuf>> {
        list_archives(&self.folder)
    }

    fn next_path(&self) -> PathBuf {
        let mut stamp = unix_millis();
        loop {
            let path = self.folder.join(archive_name(stamp));
            if !path.exists() {
                return path;
            }
            stamp += 1;
        }
    }

    /// Deletes the oldest archives beyond the retention count.
    ///
    /// Returns the number of archives removed. Individual delete failures are
    /// logged and skipped.
    pub fn prune(&self) -> ServerResult<usize> {
        let archives = self.archives()?;
        let excess = archives.len().saturating_sub(self.run);
        let mut removed = 0;

        for path in archives.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed old backup");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "cannot remove old backup"),
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ScheduledTask for BackupService {
    fn name(&self) -> &str {
        "backup"
    }

    async fn run(&self, ctx: &ServerContext) -> ServerResult<()> {
        let service = self.clone();
        let engine = Arc::clone(&ctx.engine);
        tokio::task::spawn_blocking(move || service.backup_once(&engine))
            .await
            .map_err(|e| ServerError::task_failure(self.name(), e.to_string()))??;
        Ok(())
    }
}

impl BackupService {
    /// Writes one archive and applies retention. Blocks on file I/O.
    ///
    /// Returns the path of the new archive.
    pub fn backup_once(&self, engine: &StoreEngine) -> ServerResult<PathBuf> {
        fs::create_dir_all(&self.folder).map_err(|e| {
            ServerError::task_failure(self.name(), format!("{}: {e}", self.folder.display()))
        })?;

        let path = self.next_path();
        let manifest = engine
            .export(&path)
            .map_err(|e| ServerError::task_failure(self.name(), e.to_string()))?;
        info!(path = %path.display(), size = manifest.size, "backup written");

        let removed = self.prune()?;
        if removed > 0 {
            debug!(removed, kept = self.run, "backup retention applied");
        }
        Ok(path)
    }
}

fn archive_name(stamp: u64) -> String {
    format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}")
}

fn archive_stamp(name: &str) -> Option<u64> {
    name.strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_SUFFIX)?
        .parse()
        .ok()
}

fn list_archives(folder: &Path) -> ServerResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(stamp) = name.to_str().and_then(archive_stamp) {
            found.push((stamp, entry.path()));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
