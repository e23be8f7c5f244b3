//! Port traits (interfaces) for the external collaborators

pub mod catalog;
pub mod channel;

pub use catalog::ExtensionCatalog;
pub use channel::{ChannelEndpoint, ChannelProvider, ChannelSender, OpenedChannel};
