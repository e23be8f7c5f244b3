//! Termext - Core Library
//!
//! Discovers terminal backends advertised by installed extensions and drives
//! connections to them over an asynchronous key-value message channel.

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod factory;
pub mod ports;
pub mod registry;

// Re-export pure types from termext-types
pub use termext_types::*;

pub use config::{ConfigManager, TermextConfig};
pub use connection::ExtensionConnection;
pub use error::{Result, TermextError};
pub use events::{Event, SubscriptionToken};
pub use factory::{ConnectionFactory, FactoryDescriptor};
pub use ports::{ChannelEndpoint, ChannelProvider, ChannelSender, ExtensionCatalog, OpenedChannel};
pub use registry::{FactoryRegistry, DEFAULT_CATALOG_NAME};
