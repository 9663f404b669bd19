//! Server configuration.
//!
//! Loaded from a JSON file. Every field has a default, so a partial file (or
//! none at all) is valid.
//!
//! ```json
//! {
//!   "address": "0.0.0.0",
//!   "port": 8443,
//!   "database": "~/enc.db",
//!   "certificate": "~/enc-cert.pem",
//!   "key": "~/enc-key.pem",
//!   "scheduler": { "enabled": true, "period": 10 },
//!   "backups": { "enabled": true, "period": 1800, "folder": "~/enc-backups", "run": 5 }
//! }
//! ```

use crate::error::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Periodic task scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Whether the scheduler runs at all.
    pub enabled: bool,
    /// Tick period in seconds.
    pub period: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 10,
        }
    }
}

/// Periodic backup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupsConfig {
    /// Whether backups are taken.
    pub enabled: bool,
    /// Backup period in seconds.
    pub period: u64,
    /// Folder receiving backup archives.
    pub folder: PathBuf,
    /// Number of archives to keep.
    pub run: usize,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period: 1800,
            folder: PathBuf::from("~/enc-backups"),
            run: 5,
        }
    }
}

/// Event log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Maximum number of events kept in memory.
    pub max: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            max: enc_core::DEFAULT_MAX_EVENTS,
        }
    }
}

/// Configuration for the ENC server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Empty means all interfaces.
    pub address: String,
    /// Port to bind to.
    pub port: u16,
    /// Data directory of the store.
    pub database: PathBuf,
    /// File holding the store passphrase. `ENC_PASSPHRASE` takes precedence.
    pub passphrase_file: Option<PathBuf>,
    /// PEM certificate path.
    pub certificate: PathBuf,
    /// PEM private key path.
    pub key: PathBuf,
    /// Extra host names for the generated certificate.
    pub hosts: Vec<String>,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Backup settings.
    pub backups: BackupsConfig,
    /// Event log settings.
    pub events: EventsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8443,
            database: PathBuf::from("~/enc.db"),
            passphrase_file: None,
            certificate: PathBuf::from("~/enc-cert.pem"),
            key: PathBuf::from("~/enc-key.pem"),
            hosts: Vec::new(),
            scheduler: SchedulerConfig::default(),
            backups: BackupsConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let data = std::fs::read(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&data)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(data: &[u8]) -> ServerResult<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| ServerError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that serde cannot.
    pub fn validate(&self) -> ServerResult<()> {
        if self.scheduler.enabled && self.scheduler.period == 0 {
            return Err(ServerError::Config(
                "scheduler.period must be greater than zero".into(),
            ));
        }
        if self.backups.enabled {
            if self.backups.period == 0 {
                return Err(ServerError::Config(
                    "backups.period must be greater than zero".into(),
                ));
            }
            if self.backups.run == 0 {
                return Err(ServerError::Config("backups.run must be at least 1".into()));
            }
        }
        Ok(())
    }

    /// Expands `~` in every configured path.
    pub fn expand_paths(mut self) -> ServerResult<Self> {
        self.database = expand_path(&self.database)?;
        self.certificate = expand_path(&self.certificate)?;
        self.key = expand_path(&self.key)?;
        self.backups.folder = expand_path(&self.backups.folder)?;
        if let Some(file) = &self.passphrase_file {
            self.passphrase_file = Some(expand_path(file)?);
        }
        Ok(self)
    }

    /// Returns `address:port`, using `0.0.0.0` for an empty address.
    pub fn bind_address(&self) -> String {
        let host = if self.address.is_empty() {
            "0.0.0.0"
        } else {
            self.address.as_str()
        };
        format!("{host}:{}", self.port)
    }

    /// Scheduler tick period.
    pub fn scheduler_period(&self) -> Duration {
        Duration::from_secs(self.scheduler.period)
    }

    /// Backup period.
    pub fn backup_period(&self) -> Duration {
        Duration::from_secs(self.backups.period)
    }

    /// Sets the data directory.
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = path.into();
        self
    }

    /// Sets the certificate and key paths.
    pub fn with_tls(mut self, certificate: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.certificate = certificate.into();
        self.key = key.into();
        self
    }

    /// Sets the scheduler settings.
    pub fn with_scheduler(mut self, enabled: bool, period_secs: u64) -> Self {
        self.scheduler = SchedulerConfig {
            enabled,
            period: period_secs,
        };
        self
    }

    /// Enables backups.
    pub fn with_backups(mut self, folder: impl Into<PathBuf>, period_secs: u64, run: usize) -> Self {
        self.backups = BackupsConfig {
            enabled: true,
            period: period_secs,
            folder: folder.into(),
            run,
        };
        self
    }
}

/// Expands a leading `~` to the current user's home directory.
pub fn expand_path(path: &Path) -> ServerResult<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .ok_or_else(|| ServerError::Config("cannot determine home directory".into()))?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}
