pub mod config;
pub mod connect;
pub mod list;
pub mod show;

use std::path::PathBuf;

use anyhow::Result;
use termext_core::{FactoryRegistry, TermextConfig};

use crate::config::SettingsManager;

/// Settings every command runs with, after flags override the config file
pub struct Context {
    pub settings: TermextConfig,
    pub extensions_dir: PathBuf,
    pub catalog_name: String,
}

impl Context {
    pub fn new(
        settings: TermextConfig,
        extensions_dir: Option<PathBuf>,
        catalog: Option<String>,
    ) -> Result<Self> {
        let extensions_dir = SettingsManager::extensions_dir(extensions_dir.as_deref(), &settings)?;
        let catalog_name = catalog.unwrap_or_else(|| settings.catalog_name.clone());
        Ok(Self {
            settings,
            extensions_dir,
            catalog_name,
        })
    }

    pub async fn registry(&self) -> FactoryRegistry {
        termext_adapters::discover_from_dir(&self.extensions_dir, &self.catalog_name).await
    }
}
