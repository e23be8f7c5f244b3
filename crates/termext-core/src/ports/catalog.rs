//! Extension catalog abstraction

use crate::Result;
use async_trait::async_trait;
use termext_types::{ExtensionInfo, PropertySet};

/// Registry of installed extension packages, queryable by category name
#[async_trait]
pub trait ExtensionCatalog: Send + Sync {
    /// Enumerate every extension registered under `catalog_name`
    async fn find_all(&self, catalog_name: &str) -> Result<Vec<ExtensionInfo>>;

    /// Fetch the properties an extension declares
    async fn properties(&self, extension: &ExtensionInfo) -> Result<PropertySet>;
}
