//! Extension metadata as reported by an extension catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved key holding the text content of a property sub-set
pub const TEXT_FIELD: &str = "#text";

/// One installed extension advertised under a catalog category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    /// Extension identifier; terminal backends use a UUID here
    pub id: String,
    pub display_name: String,
    /// Identifier of the package that ships the extension
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub description: String,
    /// Catalog-specific locator of the entry that declared the extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A declared property: either plain text or a nested property set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Text(String),
    Set(PropertySet),
}

/// Nested property mapping declared by an extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(BTreeMap<String, Property>);

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Property) {
        self.0.insert(key.into(), value);
    }

    /// Builder-style insert of a sub-set whose text field is `text`
    pub fn with_text(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        let mut subset = PropertySet::new();
        subset.insert(TEXT_FIELD, Property::Text(text.into()));
        self.insert(key, Property::Set(subset));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.0.get(key)
    }

    /// Nested set under `key`, if present and a set
    pub fn get_set(&self, key: &str) -> Option<&PropertySet> {
        match self.get(key) {
            Some(Property::Set(set)) => Some(set),
            _ => None,
        }
    }

    /// Plain text under `key`, if present and text
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Property::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_set_from_json() {
        let json = r##"{
            "cmdline": { "#text": "backend --stdio" },
            "Service": { "#text": "com.example.backend" },
            "flag": "plain"
        }"##;
        let set: PropertySet = serde_json::from_str(json).unwrap();

        let cmdline = set.get_set("cmdline").unwrap();
        assert_eq!(cmdline.get_text(TEXT_FIELD), Some("backend --stdio"));
        assert_eq!(set.get_text("flag"), Some("plain"));
        assert!(set.get_set("flag").is_none());
        assert!(set.get("missing").is_none());
    }
}
