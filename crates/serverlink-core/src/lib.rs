//! serverlink-core: shared types for serverlink.
//!
//! Defines the canonical link [`Status`] values spoken on the wire, the
//! per-host [`RetryConfig`] backoff policy, and the `serverlink.toml`
//! configuration file.

pub mod config;
pub mod retry;
pub mod status;

pub use config::{LinkConfig, parse_duration};
pub use retry::{RetryConfig, RetryConfigError};
pub use status::{Status, StatusParseError};

/// Address of a remote link (`host:port`, optionally `http://`-prefixed).
pub type Host = String;

/// Path probed when none is configured.
pub const DEFAULT_PATH: &str = "/serverlink";
