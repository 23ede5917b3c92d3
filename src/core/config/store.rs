//! Config persistence backends.

use super::types::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Where the settings document lives
pub trait ConfigStore: Send + Sync {
    /// Load the stored config, or `None` if nothing has been saved yet
    fn load(&self) -> Result<Option<Config>, ConfigError>;

    /// Replace the stored config
    fn save(&self, config: &Config) -> Result<(), ConfigError>;

    /// Load the stored config, falling back to (and persisting) defaults
    ///
    /// An unreadable or unparseable document is logged and replaced.
    fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(Some(config)) => return config,
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to load config, using defaults: {}", e),
        }

        let config = Config::default();
        if let Err(e) = self.save(&config) {
            tracing::warn!("Failed to persist default config: {}", e);
        }
        config
    }
}

/// Pretty-printed JSON file on disk
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/autosort/config.json`
    pub fn default_location() -> Self {
        Self::new(default_data_dir().join("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Platform config directory for this app
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autosort")
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<Option<Config>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(&self.path, content).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Keeps the document in memory; useful for tests and embedding
#[derive(Default)]
pub struct MemoryConfigStore {
    config: RwLock<Option<Config>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: RwLock::new(Some(config)),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Option<Config>, ConfigError> {
        Ok(self
            .config
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone()))
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let mut slot = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(config.clone());
        Ok(())
    }
}
