//! Concrete catalog and transport adapters for Termext

mod manifest;
mod process;

pub use manifest::{ExtensionManifest, ManifestCatalog, MANIFEST_EXTENSIONS};
pub use process::{ProcessChannelProvider, MAX_LINE_LENGTH, PACKAGE_ENV, SERVICE_ENV};

use std::path::Path;
use std::sync::Arc;
use termext_core::FactoryRegistry;

/// Discover every backend declared under `extensions_dir`, wired to child-process channels
pub async fn discover_from_dir(extensions_dir: &Path, catalog_name: &str) -> FactoryRegistry {
    let catalog = ManifestCatalog::new(extensions_dir);
    FactoryRegistry::discover(&catalog, Arc::new(ProcessChannelProvider::new()), catalog_name).await
}
