//! In-memory catalog and channel transport for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use termext_core::{
    ChannelEndpoint, ChannelProvider, ChannelSender, ConnectionState, ExtensionCatalog,
    ExtensionConnection, ExtensionInfo, OpenedChannel, Payload, PropertySet, Result,
    TermextError,
};
use tokio::sync::{mpsc, oneshot};

/// The backend side of one opened in-memory channel
pub struct Backend {
    pub endpoint: ChannelEndpoint,
    /// Payloads the connection sent
    pub sent: mpsc::UnboundedReceiver<Payload>,
    /// Push payloads towards the connection; drop to simulate the backend exiting
    pub inbound: mpsc::UnboundedSender<Payload>,
    pub shut_down: Arc<AtomicBool>,
}

impl Backend {
    pub fn push(&self, payload: Payload) {
        self.inbound.send(payload).expect("connection stopped reading");
    }

    pub async fn next_sent(&mut self) -> Option<Payload> {
        tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
            .await
            .expect("timed out waiting for an outbound payload")
    }
}

pub struct MemoryProvider {
    fail_open: Option<String>,
    fail_sends: bool,
    stall_sends: bool,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    backends: mpsc::UnboundedSender<Backend>,
    opens: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Backend>) {
        Self::build(None, false, None)
    }

    /// Sends never complete, like a backend that stopped reading
    pub fn stalled() -> (Arc<Self>, mpsc::UnboundedReceiver<Backend>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Arc::new(Self {
            fail_open: None,
            fail_sends: false,
            stall_sends: true,
            gate: Mutex::new(None),
            backends: tx,
            opens: AtomicUsize::new(0),
        });
        (provider, rx)
    }

    pub fn failing(reason: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<Backend>) {
        Self::build(Some(reason.to_string()), false, None)
    }

    pub fn rejecting_sends() -> (Arc<Self>, mpsc::UnboundedReceiver<Backend>) {
        Self::build(None, true, None)
    }

    /// Opens only complete once the returned sender fires
    pub fn gated() -> (
        Arc<Self>,
        mpsc::UnboundedReceiver<Backend>,
        oneshot::Sender<()>,
    ) {
        let (release, gate) = oneshot::channel();
        let (provider, backends) = Self::build(None, false, Some(gate));
        (provider, backends, release)
    }

    fn build(
        fail_open: Option<String>,
        fail_sends: bool,
        gate: Option<oneshot::Receiver<()>>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Backend>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Arc::new(Self {
            fail_open,
            fail_sends,
            stall_sends: false,
            gate: Mutex::new(gate),
            backends: tx,
            opens: AtomicUsize::new(0),
        });
        (provider, rx)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

struct MemorySender {
    sent: mpsc::UnboundedSender<Payload>,
    fail: bool,
    stall: bool,
    shut_down: Arc<AtomicBool>,
}

#[async_trait]
impl ChannelSender for MemorySender {
    async fn send(&self, payload: Payload) -> Result<()> {
        if self.fail {
            return Err(TermextError::Send("backend rejected payload".into()));
        }
        if self.stall {
            std::future::pending::<()>().await;
        }
        self.sent
            .send(payload)
            .map_err(|_| TermextError::Send("backend gone".into()))
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelProvider for MemoryProvider {
    async fn open(&self, endpoint: &ChannelEndpoint) -> Result<OpenedChannel> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let Some(reason) = &self.fail_open {
            return Err(TermextError::ChannelOpen(reason.clone()));
        }

        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let shut_down = Arc::new(AtomicBool::new(false));

        let _ = self.backends.send(Backend {
            endpoint: endpoint.clone(),
            sent: sent_rx,
            inbound: inbound_tx,
            shut_down: shut_down.clone(),
        });

        Ok(OpenedChannel {
            sender: Arc::new(MemorySender {
                sent: sent_tx,
                fail: self.fail_sends,
                stall: self.stall_sends,
                shut_down,
            }),
            inbound: inbound_rx,
        })
    }
}

/// Catalog serving a fixed list of extensions
pub struct MemoryCatalog {
    pub name: String,
    pub entries: Vec<(ExtensionInfo, Option<PropertySet>)>,
}

#[async_trait]
impl ExtensionCatalog for MemoryCatalog {
    async fn find_all(&self, catalog_name: &str) -> Result<Vec<ExtensionInfo>> {
        if catalog_name != self.name {
            return Ok(Vec::new());
        }
        Ok(self.entries.iter().map(|(ext, _)| ext.clone()).collect())
    }

    async fn properties(&self, extension: &ExtensionInfo) -> Result<PropertySet> {
        self.entries
            .iter()
            .find(|(ext, _)| ext.id == extension.id)
            .and_then(|(_, props)| props.clone())
            .ok_or_else(|| TermextError::Catalog(format!("no properties for {}", extension.id)))
    }
}

/// Catalog whose enumeration always fails
pub struct BrokenCatalog;

#[async_trait]
impl ExtensionCatalog for BrokenCatalog {
    async fn find_all(&self, _catalog_name: &str) -> Result<Vec<ExtensionInfo>> {
        Err(TermextError::Catalog("catalog service unavailable".into()))
    }

    async fn properties(&self, _extension: &ExtensionInfo) -> Result<PropertySet> {
        Err(TermextError::Catalog("catalog service unavailable".into()))
    }
}

pub fn extension(id: &str, name: &str) -> ExtensionInfo {
    ExtensionInfo {
        id: id.to_string(),
        display_name: name.to_string(),
        package: format!("{}.Package", name),
        ..Default::default()
    }
}

pub async fn wait_for_state(conn: &ExtensionConnection, expected: ConnectionState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while conn.state() != expected {
        if tokio::time::Instant::now() > deadline {
            panic!("connection stuck in {} waiting for {}", conn.state(), expected);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let spawned tasks run to quiescence
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
