//! Configuration management for Termext

use crate::error::{Result, TermextError};
use crate::registry::DEFAULT_CATALOG_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "termext.config.yaml",
    "termext.config.yml",
    "termext.config.json",
];

/// Host-side settings for discovering and connecting to terminal backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermextConfig {
    /// Catalog category to enumerate
    pub catalog_name: String,
    /// Root of the extension manifest tree
    pub extensions_dir: Option<PathBuf>,
    /// `tracing` filter directive, e.g. `termext_core=debug`
    pub log_filter: Option<String>,
    pub default_rows: u32,
    pub default_columns: u32,
}

impl Default for TermextConfig {
    fn default() -> Self {
        Self {
            catalog_name: DEFAULT_CATALOG_NAME.to_string(),
            extensions_dir: None,
            log_filter: None,
            default_rows: 24,
            default_columns: 80,
        }
    }
}

impl TermextConfig {
    fn validate(&self) -> Result<()> {
        if self.catalog_name.trim().is_empty() {
            return Err(TermextError::Config("catalog_name must not be empty".into()));
        }
        if self.default_rows == 0 || self.default_columns == 0 {
            return Err(TermextError::Config(
                "default_rows and default_columns must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration manager for loading and saving configuration files
pub struct ConfigManager {
    cache: std::collections::HashMap<PathBuf, CachedConfig>,
}

struct CachedConfig {
    config: TermextConfig,
    modified_time: std::time::SystemTime,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            cache: std::collections::HashMap::new(),
        }
    }

    /// Find configuration file in a directory
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load configuration from a file, reusing the cached copy if unchanged
    pub fn load(&mut self, config_path: &Path) -> Result<TermextConfig> {
        let metadata = std::fs::metadata(config_path)?;
        let modified_time = metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        if let Some(cached) = self.cache.get(config_path) {
            if cached.modified_time == modified_time {
                return Ok(cached.config.clone());
            }
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: TermextConfig = if is_json(config_path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;

        self.cache.insert(
            config_path.to_path_buf(),
            CachedConfig {
                config: config.clone(),
                modified_time,
            },
        );

        Ok(config)
    }

    /// Load configuration from a directory, falling back to defaults
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<TermextConfig> {
        match Self::find_config_file(dir) {
            Some(path) => self.load(&path),
            None => Ok(TermextConfig::default()),
        }
    }

    /// Save configuration, choosing the format from the file extension
    pub fn save(&mut self, config: &TermextConfig, config_path: &Path) -> Result<()> {
        config.validate()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = if is_json(config_path) {
            serde_json::to_string_pretty(config)?
        } else {
            serde_yaml::to_string(config)?
        };
        std::fs::write(config_path, content)?;
        self.cache.remove(config_path);

        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}
