//! GrowlTalk Core - Shared types, errors and configuration
//!
//! This crate contains the data model exchanged between kiosks, operators and
//! the signaling relay. It has no dependencies on networking code.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ConfigError, ProxyConfig, ServerConfig, SessionConfig};
pub use error::*;
pub use types::*;

/// Default listen port for the relay
pub const DEFAULT_PORT: u16 = 9999;

/// Default session TTL in milliseconds
pub const DEFAULT_TTL_MS: u64 = 10_000;

/// Smallest accepted session TTL in milliseconds
pub const MIN_TTL_MS: u64 = 1_000;

/// Largest accepted session TTL in milliseconds (one day)
pub const MAX_TTL_MS: u64 = 86_400_000;

/// Upper bound for a long-poll wait on the callers query
pub const MAX_WAIT_SECS: u64 = 60;
