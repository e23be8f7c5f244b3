//! Extension terminal connection
//!
//! Wraps one duplex channel to a terminal backend and translates it into
//! terminal semantics:
//! - `start` opens the channel asynchronously
//! - `write_input` / `resize` enqueue outbound messages while open
//! - inbound `output` is raised to output subscribers in arrival order
//! - backend `disconnect` or `error` ends the connection with a single
//!   disconnect notification
//!
//! State lives behind a mutex shared with the transport tasks. The lock is
//! never held across an `.await` or while subscribers run.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use termext_types::{ConnectionState, Message, Payload};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec;
use crate::error::{Result, TermextError};
use crate::events::{Event, SubscriptionToken};
use crate::ports::{ChannelEndpoint, ChannelProvider, ChannelSender, OpenedChannel};

/// Every this many failed sends, a failure is escalated from `warn` to `error`
pub const SEND_FAILURE_THRESHOLD: u32 = 5;

/// How long a pending send may still run once the connection has ended
pub const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// A terminal session backed by an extension's channel
pub struct ExtensionConnection {
    shared: Arc<Shared>,
}

struct Shared {
    endpoint: ChannelEndpoint,
    channels: Arc<dyn ChannelProvider>,
    inner: Mutex<Inner>,
    disconnect_raised: AtomicBool,
    send_failures: AtomicU32,
    /// Cancelled once the connection reaches a terminal state
    ended: CancellationToken,
    states: watch::Sender<ConnectionState>,
    output: Event<String>,
    disconnected: Event<()>,
}

struct Inner {
    state: ConnectionState,
    /// Send queue feeding the writer task; present only while open
    outbound: Option<mpsc::UnboundedSender<Message>>,
    reader: Option<JoinHandle<()>>,
    failure_reason: Option<String>,
}

impl ExtensionConnection {
    /// Create an unstarted connection. No I/O happens until [`start`](Self::start).
    pub fn new(endpoint: ChannelEndpoint, channels: Arc<dyn ChannelProvider>) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint,
                channels,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Uninitialized,
                    outbound: None,
                    reader: None,
                    failure_reason: None,
                }),
                disconnect_raised: AtomicBool::new(false),
                send_failures: AtomicU32::new(0),
                ended: CancellationToken::new(),
                states: watch::channel(ConnectionState::Uninitialized).0,
                output: Event::new("output"),
                disconnected: Event::new("disconnected"),
            }),
        }
    }

    /// Begin opening the channel on the current tokio runtime.
    ///
    /// Only valid from `Uninitialized`; a second call fails with
    /// [`TermextError::InvalidState`] and never opens another channel.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TermextError::NoRuntime)?;

        {
            let mut inner = self.shared.lock();
            if inner.state != ConnectionState::Uninitialized {
                return Err(TermextError::InvalidState(inner.state));
            }
            self.shared.set_state(&mut inner, ConnectionState::Connecting);
        }

        info!(
            "Opening channel to service '{}' (package: {})",
            self.shared.endpoint.service_identifier, self.shared.endpoint.package_identifier
        );

        runtime.spawn(self.shared.clone().open());
        Ok(())
    }

    /// Send keyboard input. Dropped silently unless the connection is open.
    pub fn write_input(&self, data: &str) {
        self.shared.enqueue(Message::Input(data.to_string()));
    }

    /// Announce a new terminal size. Dropped silently unless the connection is open.
    pub fn resize(&self, rows: u32, columns: u32) {
        self.shared.enqueue(Message::Resize { rows, columns });
    }

    /// Close the connection. Idempotent and non-blocking.
    ///
    /// An open connection sends a best-effort `close` to the backend first.
    /// A failed connection stays failed. A local close does not raise the
    /// disconnect notification.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        match inner.state {
            ConnectionState::Closed | ConnectionState::Failed => return,
            ConnectionState::Open => {
                if let Some(outbound) = inner.outbound.take() {
                    let _ = outbound.send(Message::Close);
                }
            }
            ConnectionState::Uninitialized | ConnectionState::Connecting => {}
        }

        self.shared.set_state(&mut inner, ConnectionState::Closed);
        if let Some(reader) = inner.reader.take() {
            reader.abort();
        }
        info!(
            "Connection to service '{}' closed",
            self.shared.endpoint.service_identifier
        );
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch state transitions as they happen
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.states.subscribe()
    }

    /// Why the connection failed, if it did
    pub fn failure_reason(&self) -> Option<String> {
        self.shared.lock().failure_reason.clone()
    }

    /// Number of outbound sends the transport rejected
    pub fn send_failure_count(&self) -> u32 {
        self.shared.send_failures.load(Ordering::SeqCst)
    }

    pub fn service_identifier(&self) -> &str {
        &self.shared.endpoint.service_identifier
    }

    pub fn package_identifier(&self) -> &str {
        &self.shared.endpoint.package_identifier
    }

    pub fn command_line(&self) -> &str {
        &self.shared.endpoint.command_line
    }

    /// Subscribe to terminal output
    pub fn on_output<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.shared.output.subscribe(handler)
    }

    pub fn remove_output(&self, token: SubscriptionToken) -> bool {
        self.shared.output.unsubscribe(token)
    }

    /// Subscribe to the (at most one) disconnect notification
    pub fn on_disconnected<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.shared.disconnected.subscribe(handler)
    }

    pub fn remove_disconnected(&self, token: SubscriptionToken) -> bool {
        self.shared.disconnected.unsubscribe(token)
    }
}

impl Drop for ExtensionConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ExtensionConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionConnection")
            .field("service", &self.shared.endpoint.service_identifier)
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self) -> ConnectionState {
        self.lock().state
    }

    fn set_state(&self, inner: &mut Inner, to: ConnectionState) {
        inner.state = to;
        if to.is_terminal() {
            self.ended.cancel();
        }
        self.states.send_replace(to);
    }

    async fn open(self: Arc<Self>) {
        match self.channels.open(&self.endpoint).await {
            Ok(channel) => self.on_opened(channel).await,
            Err(e) => self.fail(e.to_string()),
        }
    }

    async fn on_opened(self: &Arc<Self>, channel: OpenedChannel) {
        let OpenedChannel { sender, inbound } = channel;

        let superseded = {
            let mut inner = self.lock();
            if inner.state == ConnectionState::Connecting {
                let (tx, rx) = mpsc::unbounded_channel();
                if let Some((rows, columns)) = self.endpoint.startup.initial_size() {
                    let _ = tx.send(Message::Resize { rows, columns });
                }
                self.set_state(&mut inner, ConnectionState::Open);
                inner.outbound = Some(tx);
                tokio::spawn(write_loop(self.clone(), sender.clone(), rx));
                inner.reader = Some(tokio::spawn(read_loop(self.clone(), inbound)));
                None
            } else {
                Some(inner.state)
            }
        };

        match superseded {
            None => info!(
                "Channel to service '{}' is open",
                self.endpoint.service_identifier
            ),
            Some(state) => {
                debug!("Channel opened after connection became {}; releasing it", state);
                sender.shutdown().await;
            }
        }
    }

    fn enqueue(&self, message: Message) -> bool {
        let inner = self.lock();
        if inner.state != ConnectionState::Open {
            trace!("Dropping {} while {}", message.command(), inner.state);
            return false;
        }
        match &inner.outbound {
            Some(outbound) => outbound.send(message).is_ok(),
            None => false,
        }
    }

    fn handle_inbound(&self, payload: &Payload) {
        let state = self.state();
        if state != ConnectionState::Open {
            trace!("Ignoring inbound payload while {}", state);
            return;
        }

        match codec::decode(payload) {
            Message::Output(text) => {
                // close() may have run while decoding
                if self.state() == ConnectionState::Open {
                    self.output.raise(&text);
                }
            }
            Message::Disconnect | Message::Close => self.remote_closed(),
            Message::Error(reason) => self.fail(reason),
            other @ (Message::Input(_) | Message::Resize { .. }) => {
                debug!("Ignoring host-bound command '{}' from backend", other.command());
            }
        }
    }

    /// Move to `Closed` because the backend went away
    fn remote_closed(&self) {
        if self.transition(ConnectionState::Closed, None) {
            info!(
                "Service '{}' disconnected",
                self.endpoint.service_identifier
            );
            self.raise_disconnected();
        }
    }

    fn fail(&self, reason: String) {
        if self.transition(ConnectionState::Failed, Some(reason.clone())) {
            warn!(
                "Connection to service '{}' failed: {}",
                self.endpoint.service_identifier, reason
            );
            self.raise_disconnected();
        }
    }

    /// Enter a terminal state unless already terminal. Returns whether it did.
    fn transition(&self, to: ConnectionState, reason: Option<String>) -> bool {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return false;
        }
        self.set_state(&mut inner, to);
        if reason.is_some() {
            inner.failure_reason = reason;
        }
        // Dropping the queue lets the writer drain and release the channel.
        // The reader exits on its own once it sees the terminal state.
        inner.outbound = None;
        inner.reader = None;
        true
    }

    fn raise_disconnected(&self) {
        if !self.disconnect_raised.swap(true, Ordering::SeqCst) {
            self.disconnected.raise(&());
        }
    }

    fn record_send_failure(&self, err: TermextError) {
        if self.state().is_terminal() {
            debug!("Send completed with error after connection ended: {}", err);
            return;
        }

        let failures = self.send_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures % SEND_FAILURE_THRESHOLD == 0 {
            error!(
                "{} sends to service '{}' have failed; latest: {}",
                failures, self.endpoint.service_identifier, err
            );
        } else {
            warn!("Send to service '{}' failed: {}", self.endpoint.service_identifier, err);
        }
    }
}

/// Drains the send queue in order, then releases the channel. Pending sends
/// get [`CLOSE_GRACE`] after the connection ends before they are dropped.
async fn write_loop(
    shared: Arc<Shared>,
    sender: Arc<dyn ChannelSender>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    // Sends still pending this long after the connection ends are abandoned
    let deadline = async {
        shared.ended.cancelled().await;
        tokio::time::sleep(CLOSE_GRACE).await;
    };
    tokio::pin!(deadline);

    while let Some(message) = outbound.recv().await {
        if shared.state() == ConnectionState::Failed {
            continue;
        }
        trace!("Sending {}", message.command());
        tokio::select! {
            result = sender.send(codec::encode(&message)) => {
                if let Err(e) = result {
                    shared.record_send_failure(e);
                }
            }
            _ = &mut deadline => {
                debug!(
                    "Abandoning pending sends to service '{}'",
                    shared.endpoint.service_identifier
                );
                break;
            }
        }
    }

    sender.shutdown().await;
    debug!(
        "Released channel to service '{}'",
        shared.endpoint.service_identifier
    );
}

/// Handles inbound payloads in delivery order
async fn read_loop(shared: Arc<Shared>, mut inbound: mpsc::UnboundedReceiver<Payload>) {
    while let Some(payload) = inbound.recv().await {
        shared.handle_inbound(&payload);
        if shared.state().is_terminal() {
            return;
        }
    }

    shared.remote_closed();
}
