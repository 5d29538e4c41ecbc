//! Error types for probing and waiting on links.

use std::fmt;
use std::time::Duration;

use serverlink_core::{Host, Status};
use thiserror::Error;

/// A probe that produced no HTTP response.
///
/// Carries rendered messages rather than the underlying I/O and hyper
/// errors so it can be cloned into per-host outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid link address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("handshake with {address} failed: {reason}")]
    Handshake { address: String, reason: String },

    #[error("request to {address} failed: {reason}")]
    Request { address: String, reason: String },

    #[error("reading response from {address} failed: {reason}")]
    Body { address: String, reason: String },

    #[error("probe of {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Only an address that cannot be turned into a request is permanent;
    /// every failure on the wire is retried like an `offline` status.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::InvalidAddress { .. })
    }
}

/// Why a single host failed to come online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkErrorKind {
    /// Retry budget exhausted while the link was offline or starting.
    NotReady,
    /// The link answered with something unrecognizable, or its address
    /// is unusable.
    Invalid,
    /// The link explicitly reported `error`.
    Error,
}

impl LinkErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            LinkErrorKind::NotReady => "LINKNOTREADY",
            LinkErrorKind::Invalid => "LINKINVALID",
            LinkErrorKind::Error => "LINKERROR",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            LinkErrorKind::NotReady => "server link not ready",
            LinkErrorKind::Invalid => "server link invalid",
            LinkErrorKind::Error => "server link error",
        }
    }
}

impl fmt::Display for LinkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal failure of one host's poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LinkError {
    pub kind: LinkErrorKind,
    /// Probes spent before settling, including the failing one.
    pub attempts: u32,
    pub message: String,
    /// Last status the link was classified as, if any probe got a response.
    pub last_status: Option<Status>,
    /// Transport failure behind the final attempt.
    #[source]
    pub cause: Option<FetchError>,
}

impl LinkError {
    pub fn new(kind: LinkErrorKind, attempts: u32, last_status: Option<Status>) -> Self {
        let mut message = format!(
            "{} after {attempts} attempt{}",
            kind.describe(),
            if attempts == 1 { "" } else { "s" }
        );
        if let Some(status) = last_status {
            message.push_str(&format!(" (last status: {status})"));
        }
        Self {
            kind,
            attempts,
            message,
            last_status,
            cause: None,
        }
    }

    /// Settle on a transport failure, folding its message in.
    pub fn from_fetch(
        kind: LinkErrorKind,
        attempts: u32,
        last_status: Option<Status>,
        cause: FetchError,
    ) -> Self {
        let mut error = Self::new(kind, attempts, last_status);
        error.message = format!("{}: {cause}", error.message);
        error.cause = Some(cause);
        error
    }

    /// The poller task for a host died before settling.
    pub(crate) fn aborted(reason: impl fmt::Display) -> Self {
        let mut error = Self::new(LinkErrorKind::Error, 0, None);
        error.message = format!("server link poller aborted: {reason}");
        error
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Terminal result of one host's poll loop; `Ok` is always `online`.
pub type PollOutcome = Result<Status, LinkError>;

/// Aggregate failure of a multi-host wait.
///
/// Holds every host's outcome in input order, successes included.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("server links not ready [{}]", summarize(.hosts, .outcomes))]
pub struct LinksNotReady {
    pub hosts: Vec<Host>,
    pub outcomes: Vec<PollOutcome>,
}

impl LinksNotReady {
    pub const CODE: &'static str = "LINKSNOTREADY";

    /// `<host> - <message-or-status>` per host, comma-joined.
    pub fn summary(&self) -> String {
        summarize(&self.hosts, &self.outcomes)
    }

    /// Number of hosts that came online.
    pub fn ready_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Failed hosts with their position in the input list.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Host, &LinkError)> {
        self.hosts
            .iter()
            .zip(&self.outcomes)
            .enumerate()
            .filter_map(|(index, (host, outcome))| {
                outcome.as_ref().err().map(|err| (index, host, err))
            })
    }
}

fn summarize(hosts: &[Host], outcomes: &[PollOutcome]) -> String {
    hosts
        .iter()
        .zip(outcomes)
        .map(|(host, outcome)| match outcome {
            Ok(status) => format!("{host} - {status}"),
            Err(err) => format!("{host} - {}", err.message),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of [`wait`](crate::wait), shaped by the target mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// Single-host mode: that host's own error, unwrapped.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Multi-host mode: at least one host failed.
    #[error(transparent)]
    LinksNotReady(#[from] LinksNotReady),
}

impl WaitError {
    pub fn code(&self) -> &'static str {
        match self {
            WaitError::Link(err) => err.code(),
            WaitError::LinksNotReady(_) => LinksNotReady::CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_error_message_mentions_attempts_and_status() {
        let err = LinkError::new(LinkErrorKind::NotReady, 3, Some(Status::Starting));
        assert_eq!(
            err.to_string(),
            "server link not ready after 3 attempts (last status: starting)"
        );
        assert_eq!(err.code(), "LINKNOTREADY");
    }

    #[test]
    fn single_attempt_is_singular() {
        let err = LinkError::new(LinkErrorKind::Error, 1, Some(Status::Error));
        assert_eq!(
            err.to_string(),
            "server link error after 1 attempt (last status: error)"
        );
    }

    #[test]
    fn fetch_cause_is_kept_as_source() {
        let cause = FetchError::Connect {
            address: "localhost:1".to_string(),
            reason: "connection refused".to_string(),
        };
        let err = LinkError::from_fetch(LinkErrorKind::NotReady, 2, None, cause.clone());
        assert!(err.message.ends_with("connection refused"));
        assert_eq!(err.cause, Some(cause));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn only_invalid_address_is_permanent() {
        let invalid = FetchError::InvalidAddress {
            address: String::new(),
            reason: "empty".to_string(),
        };
        let timeout = FetchError::Timeout {
            address: "a:1".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(!invalid.is_transient());
        assert!(timeout.is_transient());
    }

    #[test]
    fn aggregate_lists_every_host() {
        let failed = LinkError::new(LinkErrorKind::NotReady, 3, Some(Status::Starting));
        let agg = LinksNotReady {
            hosts: vec!["a:1".to_string(), "b:2".to_string()],
            outcomes: vec![Ok(Status::Online), Err(failed.clone())],
        };
        assert_eq!(
            agg.to_string(),
            format!("server links not ready [a:1 - online, b:2 - {}]", failed.message)
        );
        assert_eq!(agg.to_string(), format!("server links not ready [{}]", agg.summary()));
        assert!(std::error::Error::source(&agg).is_none());
        assert_eq!(agg.ready_count(), 1);
        let failures: Vec<_> = agg.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(failures[0].1, "b:2");
    }

    #[test]
    fn wait_error_codes() {
        let link = WaitError::from(LinkError::new(LinkErrorKind::Invalid, 1, None));
        assert_eq!(link.code(), "LINKINVALID");
        let agg = WaitError::from(LinksNotReady {
            hosts: vec![],
            outcomes: vec![],
        });
        assert_eq!(agg.code(), "LINKSNOTREADY");
    }
}
