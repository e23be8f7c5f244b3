//! Termext Types - Pure type definitions
//!
//! Wire payloads, protocol messages, extension metadata and connection
//! lifecycle types shared by the core library, adapters and CLI. This crate
//! has no async runtime dependencies.

pub mod connection;
pub mod extension;
pub mod message;
pub mod payload;

pub use connection::*;
pub use extension::*;
pub use message::*;
pub use payload::*;
