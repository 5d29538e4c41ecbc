//! Canonical link status values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Readiness reported by a remote link.
///
/// `Invalid` is never advertised by a well-behaved responder; the probing
/// side produces it for any response it cannot recognize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Offline,
    Starting,
    #[default]
    Online,
    Error,
    Invalid,
}

impl Status {
    /// All recognized statuses, in wire order.
    pub const ALL: [Status; 5] = [
        Status::Offline,
        Status::Starting,
        Status::Online,
        Status::Error,
        Status::Invalid,
    ];

    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Offline => "offline",
            Status::Starting => "starting",
            Status::Online => "online",
            Status::Error => "error",
            Status::Invalid => "invalid",
        }
    }

    /// Whether a poller should probe again after seeing this status.
    pub fn is_retryable(self) -> bool {
        matches!(self, Status::Offline | Status::Starting)
    }

    /// Whether this status ends polling without success.
    pub fn is_fatal(self) -> bool {
        matches!(self, Status::Error | Status::Invalid)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the recognized status names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid server status: {0:?}")]
pub struct StatusParseError(pub String);

impl FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
    }

    #[test]
    fn rejects_unknown_and_differently_cased_names() {
        assert!("bogus".parse::<Status>().is_err());
        assert!("Online".parse::<Status>().is_err());
        assert!(" online".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn retryable_and_fatal_partition() {
        assert!(Status::Offline.is_retryable());
        assert!(Status::Starting.is_retryable());
        assert!(Status::Error.is_fatal());
        assert!(Status::Invalid.is_fatal());
        assert!(!Status::Online.is_retryable());
        assert!(!Status::Online.is_fatal());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        #[derive(Deserialize)]
        struct Holder {
            status: Status,
        }
        let parsed: Holder = toml::from_str("status = \"starting\"").unwrap();
        assert_eq!(parsed.status, Status::Starting);
    }

    #[test]
    fn default_is_online() {
        assert_eq!(Status::default(), Status::Online);
    }
}
