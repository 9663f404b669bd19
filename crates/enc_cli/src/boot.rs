//! Startup steps shared by every mode.

use crate::Cli;
use enc_core::{Config, CoreError, Passphrase, StoreEngine};
use enc_server::{ServerConfig, ServerError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable holding the store passphrase.
pub const PASSPHRASE_ENV: &str = "ENC_PASSPHRASE";

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum BootError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The store could not be opened.
    #[error("cannot open store: {0}")]
    Store(#[from] CoreError),

    /// No passphrase source is configured.
    #[error("no passphrase: set {PASSPHRASE_ENV} or `passphrase_file` in the configuration")]
    MissingPassphrase,

    /// The passphrase file could not be read.
    #[error("cannot read passphrase file {path}: {source}")]
    PassphraseFile {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Signal handlers could not be registered.
    #[error("signal handling: {0}")]
    Io(#[from] std::io::Error),

    /// A runtime task failed to complete.
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Loads the configuration file, applies flag overrides, expands paths.
pub fn load_config(cli: &Cli) -> Result<ServerConfig, BootError> {
    let mut config = match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.database = data.clone();
    }
    Ok(config.expand_paths()?)
}

/// Returns the passphrase from the environment or the configured file.
pub fn resolve_passphrase(
    env_value: Option<String>,
    file: Option<&Path>,
) -> Result<Passphrase, BootError> {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Ok(Passphrase::new(value));
    }
    let path = file.ok_or(BootError::MissingPassphrase)?;
    let contents = std::fs::read(path).map_err(|source| BootError::PassphraseFile {
        path: path.to_path_buf(),
        source,
    })?;
    let passphrase = Passphrase::from_file_contents(contents);
    if passphrase.is_empty() {
        return Err(BootError::MissingPassphrase);
    }
    Ok(passphrase)
}

/// Creates the engine without opening it.
pub fn engine(config: &ServerConfig) -> Result<Arc<StoreEngine>, BootError> {
    let passphrase = resolve_passphrase(
        std::env::var(PASSPHRASE_ENV).ok(),
        config.passphrase_file.as_deref(),
    )?;
    Ok(Arc::new(StoreEngine::new(
        &config.database,
        passphrase,
        Config::default(),
    )))
}

/// Opens (or creates) the store.
pub async fn setup(engine: &Arc<StoreEngine>) -> Result<(), BootError> {
    let worker = Arc::clone(engine);
    let is_new = tokio::task::spawn_blocking(move || worker.setup()).await??;
    if is_new {
        info!("created a new store");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn environment_wins_over_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("pass");
        std::fs::write(&file, "from file\n").unwrap();

        let p = resolve_passphrase(Some("from env".into()), Some(&file)).unwrap();
        assert_eq!(p.as_bytes(), b"from env");

        let p = resolve_passphrase(None, Some(&file)).unwrap();
        assert_eq!(p.as_bytes(), b"from file");

        let p = resolve_passphrase(Some(String::new()), Some(&file)).unwrap();
        assert_eq!(p.as_bytes(), b"from file");
    }

    #[test]
    fn missing_sources_are_errors() {
        assert!(matches!(
            resolve_passphrase(None, None),
            Err(BootError::MissingPassphrase)
        ));

        let dir = tempdir().unwrap();
        assert!(matches!(
            resolve_passphrase(None, Some(&dir.path().join("absent"))),
            Err(BootError::PassphraseFile { .. })
        ));

        let empty = dir.path().join("empty");
        std::fs::write(&empty, "\n").unwrap();
        assert!(matches!(
            resolve_passphrase(None, Some(&empty)),
            Err(BootError::MissingPassphrase)
        ));
    }

    #[test]
    fn data_flag_overrides_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("enc.json");
        std::fs::write(&config_path, r#"{"database": "/somewhere/else", "port": 9443}"#).unwrap();

        let cli = Cli::parse_from([
            "encd",
            "--config",
            config_path.to_str().unwrap(),
            "--data",
            dir.path().to_str().unwrap(),
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.database, dir.path());
        assert_eq!(config.port, 9443);
    }

    #[test]
    fn export_and_import_conflict() {
        assert!(Cli::try_parse_from(["encd", "--export", "--import", "a.tar"]).is_err());
        let cli = Cli::try_parse_from(["encd", "--export"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("enc.tar"));
    }
}
