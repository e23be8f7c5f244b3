//! Error types for Termext

use termext_types::ConnectionState;
use thiserror::Error;

/// Main error type for Termext
#[derive(Error, Debug)]
pub enum TermextError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Failed to open channel: {0}")]
    ChannelOpen(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Protocol decode error: {0}")]
    Decode(String),

    #[error("Operation not valid in state {0}")]
    InvalidState(ConnectionState),

    #[error("No async runtime available to drive the connection")]
    NoRuntime,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TermextError>;
