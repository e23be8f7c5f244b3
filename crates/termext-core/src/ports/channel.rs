//! Duplex channel transport abstraction

use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use termext_types::{Payload, StartupInfo};
use tokio::sync::mpsc;

/// Where a connection's channel should lead
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelEndpoint {
    /// Service name the backend package exposes
    pub service_identifier: String,
    /// Package that ships the backend
    pub package_identifier: String,
    pub command_line: String,
    pub startup: StartupInfo,
}

/// An opened channel: the outbound half plus the stream of inbound payloads.
///
/// The transport ends the inbound stream when the backend goes away.
pub struct OpenedChannel {
    pub sender: Arc<dyn ChannelSender>,
    pub inbound: mpsc::UnboundedReceiver<Payload>,
}

/// Outbound half of an open channel
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Submit one payload to the backend
    async fn send(&self, payload: Payload) -> Result<()>;

    /// Release the channel. Called once when the owning connection is done.
    async fn shutdown(&self);
}

/// Opens channels to terminal backends
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    async fn open(&self, endpoint: &ChannelEndpoint) -> Result<OpenedChannel>;
}
