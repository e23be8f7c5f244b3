//! Connection lifecycle types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a terminal connection.
///
/// Transitions only move forward:
/// `Uninitialized -> Connecting -> {Open, Failed, Closed}`,
/// `Open -> {Closed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Open,
    Failed,
    Closed,
}

impl ConnectionState {
    /// `Failed` and `Closed` are never left once reached
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Uninitialized => write!(f, "uninitialized"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Failed => write!(f, "failed"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Startup parameters handed to a factory when creating a connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupInfo {
    /// Initial terminal height, sent as a resize once the channel opens
    pub rows: Option<u32>,
    /// Initial terminal width
    pub columns: Option<u32>,
    pub starting_directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl StartupInfo {
    pub fn with_size(mut self, rows: u32, columns: u32) -> Self {
        self.rows = Some(rows);
        self.columns = Some(columns);
        self
    }

    pub fn with_starting_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.starting_directory = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Initial size, only when both dimensions are present
    pub fn initial_size(&self) -> Option<(u32, u32)> {
        match (self.rows, self.columns) {
            (Some(rows), Some(columns)) => Some((rows, columns)),
            _ => None,
        }
    }
}
