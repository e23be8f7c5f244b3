//! Manifest directory catalog
//!
//! Serves extension metadata from a directory tree:
//! - `<root>/<catalog name>/*.yaml` - one manifest per extension
//! - `<root>/<catalog name>/*.json` - same, JSON encoded
//!
//! A manifest lists the extension's identity and its declared properties:
//!
//! ```yaml
//! id: 0f8a4c6e-2b1d-4e3f-a5c7-9d8e7f6a5b4c
//! display_name: SSH
//! package: Example.Ssh
//! properties:
//!   cmdline: { "#text": "ssh-backend --stdio" }
//!   Service: { "#text": "com.example.ssh" }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use termext_core::{ExtensionCatalog, ExtensionInfo, PropertySet, Result, TermextError};
use tracing::{debug, warn};

/// Manifest file extensions recognised by the catalog
pub const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// On-disk description of one extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: PropertySet,
}

impl ExtensionManifest {
    pub fn info(&self) -> ExtensionInfo {
        ExtensionInfo {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            package: self.package.clone(),
            description: self.description.clone(),
            source: None,
        }
    }
}

/// Extension catalog backed by a manifest directory
pub struct ManifestCatalog {
    root: PathBuf,
}

impl ManifestCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load every readable manifest of a category with its path, in file-name order
    pub async fn load_manifests(
        &self,
        catalog_name: &str,
    ) -> Result<Vec<(PathBuf, ExtensionManifest)>> {
        let dir = self.root.join(catalog_name);
        if !tokio::fs::try_exists(&dir).await? {
            debug!("No manifest directory at {:?}", dir);
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && is_manifest(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut manifests = Vec::with_capacity(paths.len());
        for path in paths {
            match load_manifest(&path).await {
                Ok(manifest) => manifests.push((path, manifest)),
                Err(e) => warn!("Skipping manifest {:?}: {}", path, e),
            }
        }
        Ok(manifests)
    }

    /// Categories present under the root
    pub async fn catalog_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl ExtensionCatalog for ManifestCatalog {
    async fn find_all(&self, catalog_name: &str) -> Result<Vec<ExtensionInfo>> {
        Ok(self
            .load_manifests(catalog_name)
            .await?
            .into_iter()
            .map(|(path, manifest)| ExtensionInfo {
                source: Some(path.to_string_lossy().into_owned()),
                ..manifest.info()
            })
            .collect())
    }

    async fn properties(&self, extension: &ExtensionInfo) -> Result<PropertySet> {
        match &extension.source {
            Some(source) => self.properties_at(Path::new(source), &extension.id).await,
            None => self.properties_by_id(&extension.id).await,
        }
    }
}

impl ManifestCatalog {
    /// Properties from the manifest file an extension was listed from
    async fn properties_at(&self, path: &Path, id: &str) -> Result<PropertySet> {
        if !path.starts_with(&self.root) {
            return Err(TermextError::Catalog(format!(
                "manifest {:?} is outside {:?}",
                path, self.root
            )));
        }
        let manifest = load_manifest(path).await?;
        if manifest.id != id {
            return Err(TermextError::Catalog(format!(
                "manifest {:?} no longer declares extension '{}'",
                path, id
            )));
        }
        Ok(manifest.properties)
    }

    /// First manifest in any category declaring `id`
    async fn properties_by_id(&self, id: &str) -> Result<PropertySet> {
        for name in self.catalog_names().await? {
            if let Some((_, manifest)) = self
                .load_manifests(&name)
                .await?
                .into_iter()
                .find(|(_, m)| m.id == id)
            {
                return Ok(manifest.properties);
            }
        }
        Err(TermextError::Catalog(format!(
            "no manifest declares extension '{}'",
            id
        )))
    }
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MANIFEST_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

async fn load_manifest(path: &Path) -> Result<ExtensionManifest> {
    let content = tokio::fs::read_to_string(path).await?;
    let manifest = if path.extension().map(|e| e == "json").unwrap_or(false) {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(manifest)
}
