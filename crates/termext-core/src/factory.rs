//! Connection factories built from extension metadata

use std::sync::Arc;

use termext_types::{ExtensionInfo, PropertySet, StartupInfo, TEXT_FIELD};
use tracing::debug;
use uuid::Uuid;

use crate::connection::ExtensionConnection;
use crate::ports::{ChannelEndpoint, ChannelProvider};

/// Property holding the backend command line
pub const CMDLINE_PROPERTY: &str = "cmdline";
/// Property holding the service name the backend package exposes
pub const SERVICE_PROPERTY: &str = "Service";
/// Property holding an optional icon URI
pub const ICON_PROPERTY: &str = "Icon";

/// Immutable metadata describing one kind of terminal backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryDescriptor {
    display_name: String,
    command_line: String,
    service_identifier: String,
    package_identifier: String,
    connection_type: Uuid,
    icon: Option<String>,
}

impl FactoryDescriptor {
    /// Build a descriptor from an extension and its declared properties.
    ///
    /// Returns `None` when the display name is empty or the extension id is
    /// not a UUID. Missing optional properties become empty strings.
    pub fn try_load(extension: &ExtensionInfo, properties: &PropertySet) -> Option<Self> {
        if extension.display_name.is_empty() {
            debug!("Skipping extension '{}': empty display name", extension.id);
            return None;
        }

        let command_line = nested_text(properties, CMDLINE_PROPERTY);
        let service_identifier = nested_text(properties, SERVICE_PROPERTY);
        let icon = Some(nested_text(properties, ICON_PROPERTY)).filter(|s| !s.is_empty());

        let connection_type = match Uuid::parse_str(extension.id.trim()) {
            Ok(id) => id,
            Err(e) => {
                debug!(
                    "Skipping extension '{}' ({}): id is not a UUID: {}",
                    extension.display_name, extension.id, e
                );
                return None;
            }
        };

        Some(Self {
            display_name: extension.display_name.clone(),
            command_line,
            service_identifier,
            package_identifier: extension.package.clone(),
            connection_type,
            icon,
        })
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn service_identifier(&self) -> &str {
        &self.service_identifier
    }

    pub fn package_identifier(&self) -> &str {
        &self.package_identifier
    }

    pub fn connection_type(&self) -> Uuid {
        self.connection_type
    }

    pub fn icon_uri(&self) -> Option<&str> {
        self.icon.as_deref()
    }
}

/// Text of the `#text` field inside the sub-set stored under `key`.
///
/// Any missing link in that chain yields an empty string.
pub fn nested_text(properties: &PropertySet, key: &str) -> String {
    properties
        .get_set(key)
        .and_then(|subset| subset.get_text(TEXT_FIELD))
        .unwrap_or_default()
        .to_string()
}

/// A descriptor bound to the channel provider that reaches its backend
#[derive(Clone)]
pub struct ConnectionFactory {
    descriptor: FactoryDescriptor,
    channels: Arc<dyn ChannelProvider>,
}

impl ConnectionFactory {
    pub fn new(descriptor: FactoryDescriptor, channels: Arc<dyn ChannelProvider>) -> Self {
        Self {
            descriptor,
            channels,
        }
    }

    /// Create a new, unstarted connection to this backend
    pub fn create(&self, startup: StartupInfo) -> ExtensionConnection {
        let endpoint = ChannelEndpoint {
            service_identifier: self.descriptor.service_identifier.clone(),
            package_identifier: self.descriptor.package_identifier.clone(),
            command_line: self.descriptor.command_line.clone(),
            startup,
        };
        ExtensionConnection::new(endpoint, self.channels.clone())
    }

    pub fn descriptor(&self) -> &FactoryDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn command_line(&self) -> &str {
        self.descriptor.command_line()
    }

    pub fn connection_type(&self) -> Uuid {
        self.descriptor.connection_type()
    }

    pub fn icon_uri(&self) -> Option<&str> {
        self.descriptor.icon_uri()
    }
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termext_types::{ConnectionState, Property};

    const ID: &str = "5f3c9d2e-8a41-4b6f-9e0d-1c2b3a4d5e6f";

    fn extension(id: &str, name: &str) -> ExtensionInfo {
        ExtensionInfo {
            id: id.to_string(),
            display_name: name.to_string(),
            package: "Example.Backend_8wekyb3d8bbwe".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_try_load_full() {
        let properties = PropertySet::new()
            .with_text(CMDLINE_PROPERTY, "backend.exe --stdio")
            .with_text(SERVICE_PROPERTY, "com.example.backend")
            .with_text(ICON_PROPERTY, "ms-appx:///icon.png");

        let descriptor = FactoryDescriptor::try_load(&extension(ID, "Example"), &properties).unwrap();
        assert_eq!(descriptor.name(), "Example");
        assert_eq!(descriptor.command_line(), "backend.exe --stdio");
        assert_eq!(descriptor.service_identifier(), "com.example.backend");
        assert_eq!(descriptor.package_identifier(), "Example.Backend_8wekyb3d8bbwe");
        assert_eq!(descriptor.connection_type(), Uuid::parse_str(ID).unwrap());
        assert_eq!(descriptor.icon_uri(), Some("ms-appx:///icon.png"));
    }

    #[test]
    fn test_try_load_missing_optional_properties() {
        let descriptor =
            FactoryDescriptor::try_load(&extension(ID, "Bare"), &PropertySet::new()).unwrap();
        assert_eq!(descriptor.command_line(), "");
        assert_eq!(descriptor.service_identifier(), "");
        assert_eq!(descriptor.icon_uri(), None);
    }

    #[test]
    fn test_try_load_rejects_empty_name() {
        assert!(FactoryDescriptor::try_load(&extension(ID, ""), &PropertySet::new()).is_none());
    }

    #[test]
    fn test_try_load_rejects_bad_id() {
        let ext = extension("not-a-guid", "Broken");
        assert!(FactoryDescriptor::try_load(&ext, &PropertySet::new()).is_none());
    }

    #[test]
    fn test_try_load_accepts_braced_id() {
        let braced = format!("{{{}}}", ID.to_uppercase());
        let descriptor =
            FactoryDescriptor::try_load(&extension(&braced, "Braced"), &PropertySet::new()).unwrap();
        assert_eq!(descriptor.connection_type(), Uuid::parse_str(ID).unwrap());
    }

    #[test]
    fn test_nested_text_missing_links() {
        let mut properties = PropertySet::new();
        properties.insert("plain", Property::Text("not a set".to_string()));
        properties.insert("empty", Property::Set(PropertySet::new()));
        let mut wrong = PropertySet::new();
        wrong.insert(TEXT_FIELD, Property::Set(PropertySet::new()));
        properties.insert("wrong", Property::Set(wrong));

        assert_eq!(nested_text(&properties, "absent"), "");
        assert_eq!(nested_text(&properties, "plain"), "");
        assert_eq!(nested_text(&properties, "empty"), "");
        assert_eq!(nested_text(&properties, "wrong"), "");
    }

    #[test]
    fn test_create_is_unstarted() {
        struct NeverOpened;

        #[async_trait::async_trait]
        impl ChannelProvider for NeverOpened {
            async fn open(
                &self,
                _endpoint: &ChannelEndpoint,
            ) -> crate::Result<crate::ports::OpenedChannel> {
                panic!("create must not open a channel");
            }
        }

        let properties = PropertySet::new()
            .with_text(CMDLINE_PROPERTY, "backend --stdio")
            .with_text(SERVICE_PROPERTY, "com.example.backend");
        let descriptor = FactoryDescriptor::try_load(&extension(ID, "Example"), &properties).unwrap();
        let factory = ConnectionFactory::new(descriptor, Arc::new(NeverOpened));

        let conn = factory.create(StartupInfo::default().with_size(24, 80));
        assert_eq!(conn.state(), ConnectionState::Uninitialized);
        assert_eq!(conn.service_identifier(), "com.example.backend");
        assert_eq!(conn.command_line(), "backend --stdio");
        assert_eq!(conn.package_identifier(), "Example.Backend_8wekyb3d8bbwe");
    }
}
