//! serverlink: block until remote links report readiness.
//!
//! A link advertises its status (`offline`, `starting`, `online`,
//! `error`) as plain text over HTTP. This crate probes one or many links,
//! retrying each independently with exponential backoff, and reports
//! every host's outcome.
//!
//! # Architecture
//!
//! ```text
//! LinkClient::wait(targets, options)
//!   ├── one tokio task per host
//!   │   └── LinkPoller
//!   │       ├── FetchOverride (optional, per attempt) → HttpFetcher fallback
//!   │       ├── classify() → Status
//!   │       └── next_step() → Continue(delay) | Succeed | Fail
//!   └── JoinSet settles every task back into input order → Ready | WaitError
//! ```
//!
//! # Failure model
//!
//! `offline`, `starting`, and transport failures are retried until the
//! attempt budget runs out (`LINKNOTREADY`). `error` (`LINKERROR`) and
//! unrecognized responses (`LINKINVALID`) stop that host immediately.
//! One host's failure never cancels another; a multi-host wait that fails
//! returns `LINKSNOTREADY` carrying every outcome, successes included.

pub mod classify;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod poller;

pub use classify::{RawResponse, classify};
pub use coordinator::{LinkClient, Ready, Targets, WaitOptions, get, wait, wait_all, wait_one};
pub use error::{FetchError, LinkError, LinkErrorKind, LinksNotReady, PollOutcome, WaitError};
pub use fetch::{FetchOverride, HttpFetcher, MAX_BODY_BYTES, Probe, ProbeContext, ProbeRequest};
pub use poller::{LinkPoller, PollState, Step, next_step};
pub use serverlink_core::{DEFAULT_PATH, Host, RetryConfig, Status};
