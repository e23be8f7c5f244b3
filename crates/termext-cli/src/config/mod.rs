//! Configuration management

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use termext_core::{ConfigManager, TermextConfig};

/// Name of the manifest tree under the termext home
const EXTENSIONS_DIR_NAME: &str = "extensions";

pub struct SettingsManager;

impl SettingsManager {
    /// Get the termext home directory (~/.termext)
    pub fn termext_home() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("TERMEXT_HOME") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".termext"))
    }

    /// Load configuration from the termext home, defaults if none exists
    pub fn load() -> Result<TermextConfig> {
        let home = Self::termext_home()?;
        Self::load_from(&home)
    }

    pub fn load_from(home: &Path) -> Result<TermextConfig> {
        ConfigManager::new()
            .load_from_dir(home)
            .with_context(|| format!("Failed to load configuration from {:?}", home))
    }

    /// Path of the configuration file in use, if any
    pub fn config_path() -> Result<Option<PathBuf>> {
        Ok(ConfigManager::find_config_file(&Self::termext_home()?))
    }

    /// Pick the manifest directory: explicit flag, then config, then home
    pub fn extensions_dir(
        override_dir: Option<&Path>,
        config: &TermextConfig,
    ) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &config.extensions_dir {
            return Ok(dir.clone());
        }
        Ok(Self::termext_home()?.join(EXTENSIONS_DIR_NAME))
    }
}
