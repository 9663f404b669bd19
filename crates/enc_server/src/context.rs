//! Shared handle passed to every runtime component.

use crate::config::ServerConfig;
use enc_core::{EventLog, StoreEngine};
use std::sync::Arc;

/// Everything a running server component needs.
///
/// Built once at boot and cloned into the scheduler, the backup loop and the
/// request dispatcher. Cloning only bumps reference counts.
#[derive(Debug, Clone)]
pub struct ServerContext {
    /// The store engine.
    pub engine: Arc<StoreEngine>,
    /// Effective configuration, with paths expanded.
    pub config: Arc<ServerConfig>,
    /// Lifecycle event history.
    pub events: Arc<EventLog>,
    /// SHA-256 fingerprint of the TLS certificate, if one was loaded.
    pub fingerprint: Option<String>,
}

impl ServerContext {
    /// Creates a context with an event log sized from the configuration.
    pub fn new(engine: Arc<StoreEngine>, config: ServerConfig) -> Self {
        let events = Arc::new(EventLog::new(config.events.max));
        Self {
            engine,
            config: Arc::new(config),
            events,
            fingerprint: None,
        }
    }

    /// Records the certificate fingerprint.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }
}
