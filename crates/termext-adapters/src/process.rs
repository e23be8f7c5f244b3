//! Child-process channel transport
//!
//! Runs a backend's command line as a child process and exchanges payloads
//! as newline-delimited JSON objects:
//! - host -> backend on the child's stdin
//! - backend -> host on the child's stdout
//!
//! The child's stderr is inherited so backend diagnostics stay visible.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use termext_core::{
    ChannelEndpoint, ChannelProvider, ChannelSender, OpenedChannel, Payload, Result, TermextError,
};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Maximum length of one JSON line in either direction (1 MiB)
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Environment variable carrying the service identifier to the backend
pub const SERVICE_ENV: &str = "TERMEXT_SERVICE";
/// Environment variable carrying the package identifier to the backend
pub const PACKAGE_ENV: &str = "TERMEXT_PACKAGE";

/// How long a backend may take to exit after its stdin closes
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Opens channels by spawning the backend's command line
#[derive(Debug, Clone, Default)]
pub struct ProcessChannelProvider;

impl ProcessChannelProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelProvider for ProcessChannelProvider {
    async fn open(&self, endpoint: &ChannelEndpoint) -> Result<OpenedChannel> {
        let command_line = endpoint.command_line.trim();
        if command_line.is_empty() {
            return Err(TermextError::ChannelOpen(format!(
                "service '{}' declares no command line",
                endpoint.service_identifier
            )));
        }

        let mut cmd = shell_command(command_line);
        cmd.env(SERVICE_ENV, &endpoint.service_identifier)
            .env(PACKAGE_ENV, &endpoint.package_identifier)
            .envs(&endpoint.startup.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &endpoint.startup.starting_directory {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            TermextError::ChannelOpen(format!("failed to spawn '{}': {}", command_line, e))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TermextError::ChannelOpen("backend stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TermextError::ChannelOpen("backend stdout unavailable".into()))?;

        info!(
            "Spawned backend for '{}' (pid: {:?})",
            endpoint.service_identifier,
            child.id()
        );

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump_stdout(
            FramedRead::new(stdout, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
            inbound_tx,
        ));

        Ok(OpenedChannel {
            sender: Arc::new(ProcessSender {
                writer: Mutex::new(Some(FramedWrite::new(
                    stdin,
                    LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
                ))),
                child: Mutex::new(child),
            }),
            inbound: inbound_rx,
        })
    }
}

struct ProcessSender {
    writer: Mutex<Option<FramedWrite<ChildStdin, LinesCodec>>>,
    child: Mutex<Child>,
}

#[async_trait]
impl ChannelSender for ProcessSender {
    async fn send(&self, payload: Payload) -> Result<()> {
        let line = serde_json::to_string(&payload)?;
        let mut writer = self.writer.lock().await;
        let writer = writer
            .as_mut()
            .ok_or_else(|| TermextError::Send("channel already shut down".into()))?;
        writer.send(line).await.map_err(codec_error)
    }

    async fn shutdown(&self) {
        // A send stuck on a full pipe keeps the writer locked; skip the
        // graceful close then and go straight to the child.
        let writer = self.writer.try_lock().ok().and_then(|mut writer| writer.take());
        if let Some(mut writer) = writer {
            match tokio::time::timeout(SHUTDOWN_GRACE, SinkExt::<String>::close(&mut writer)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Closing backend stdin failed: {}", e),
                Err(_) => debug!("Backend is not draining stdin"),
            }
        }

        let mut child = self.child.lock().await;
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("Backend exited with {}", status),
            Ok(Err(e)) => warn!("Failed to wait for backend: {}", e),
            Err(_) => {
                debug!("Backend still running after stdin closed; killing it");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill backend: {}", e);
                }
            }
        }
    }
}

/// Forward each stdout line as a payload until the backend closes stdout
async fn pump_stdout(
    mut lines: FramedRead<ChildStdout, LinesCodec>,
    inbound: mpsc::UnboundedSender<Payload>,
) {
    while let Some(line) = lines.next().await {
        let payload = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => serde_json::from_str::<Payload>(&line).unwrap_or_else(|e| {
                warn!("Backend sent a line that is not a JSON object: {}", e);
                // No command key, so the connection sees a decode error
                Payload::new()
            }),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("Backend sent a line longer than {} bytes", MAX_LINE_LENGTH);
                Payload::new()
            }
            Err(LinesCodecError::Io(e)) => {
                warn!("Reading backend stdout failed: {}", e);
                break;
            }
        };

        if inbound.send(payload).is_err() {
            break;
        }
    }
    debug!("Backend stdout closed");
}

fn codec_error(e: LinesCodecError) -> TermextError {
    match e {
        LinesCodecError::Io(e) => TermextError::Send(e.to_string()),
        LinesCodecError::MaxLineLengthExceeded => {
            TermextError::Send(format!("payload exceeds {} bytes", MAX_LINE_LENGTH))
        }
    }
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command_line]);
    cmd
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command_line]);
    cmd
}
