//! Engine configuration.

/// Configuration for opening a store engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create an empty store if none exists.
    pub create_if_missing: bool,

    /// Whether every mutation is persisted before it returns.
    ///
    /// When disabled, changes stay in memory until [`flush`](crate::StoreEngine::flush).
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to persist on every mutation.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_write);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new().create_if_missing(false).sync_on_write(false);

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_write);
    }
}
