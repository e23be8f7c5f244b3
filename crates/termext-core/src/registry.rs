//! Factory registry
//!
//! A snapshot of every terminal backend advertised in an extension catalog,
//! taken once by [`FactoryRegistry::discover`]. The registry never changes
//! afterwards; construct a new one to pick up newly installed extensions.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::factory::{ConnectionFactory, FactoryDescriptor};
use crate::ports::{ChannelProvider, ExtensionCatalog};

/// Catalog category terminal backends register under by default
pub const DEFAULT_CATALOG_NAME: &str = "com.microsoft.terminal.connection";

/// Immutable, ordered set of connection factories
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    factories: Vec<ConnectionFactory>,
}

impl FactoryRegistry {
    /// Enumerate `catalog_name` and keep every extension that describes a
    /// valid backend, in catalog order.
    ///
    /// Extensions with unusable metadata are skipped. A catalog that cannot
    /// be enumerated yields an empty registry.
    pub async fn discover(
        catalog: &dyn ExtensionCatalog,
        channels: Arc<dyn ChannelProvider>,
        catalog_name: &str,
    ) -> Self {
        let extensions = match catalog.find_all(catalog_name).await {
            Ok(extensions) => extensions,
            Err(e) => {
                error!("Failed to enumerate catalog '{}': {}", catalog_name, e);
                return Self::default();
            }
        };
        debug!(
            "Catalog '{}' lists {} extension(s)",
            catalog_name,
            extensions.len()
        );

        let properties = join_all(extensions.iter().map(|ext| catalog.properties(ext))).await;

        let mut factories = Vec::new();
        for (extension, properties) in extensions.iter().zip(properties) {
            let properties = match properties {
                Ok(properties) => properties,
                Err(e) => {
                    warn!(
                        "Skipping extension '{}': failed to read properties: {}",
                        extension.id, e
                    );
                    continue;
                }
            };

            if let Some(descriptor) = FactoryDescriptor::try_load(extension, &properties) {
                debug!(
                    "Loaded backend '{}' ({})",
                    descriptor.name(),
                    descriptor.connection_type()
                );
                factories.push(ConnectionFactory::new(descriptor, channels.clone()));
            }
        }

        info!(
            "Discovered {} terminal backend(s) in '{}'",
            factories.len(),
            catalog_name
        );
        Self { factories }
    }

    /// Build a registry from descriptors resolved elsewhere, keeping their order
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = FactoryDescriptor>,
        channels: Arc<dyn ChannelProvider>,
    ) -> Self {
        Self {
            factories: descriptors
                .into_iter()
                .map(|d| ConnectionFactory::new(d, channels.clone()))
                .collect(),
        }
    }

    /// First factory whose connection type matches `id`
    pub fn get_factory(&self, id: Uuid) -> Option<&ConnectionFactory> {
        self.factories.iter().find(|f| f.connection_type() == id)
    }

    /// All factories in discovery order
    pub fn get_factories(&self) -> &[ConnectionFactory] {
        &self.factories
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
