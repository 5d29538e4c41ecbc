//! Per-host retry state machine.
//!
//! Each attempt is classified and turned into an explicit [`Step`]; the
//! poll loop only ever sleeps, succeeds, or fails on what that step says.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use serverlink_core::{Host, RetryConfig, Status};

use crate::error::{FetchError, LinkError, LinkErrorKind, PollOutcome};
use crate::fetch::{FetchOverride, HttpFetcher, Probe, ProbeContext, ProbeRequest};

/// Where a poller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Attempt `n` is in flight.
    Probing(u32),
    /// Attempt `n` was retryable; waiting out the backoff.
    Retrying(u32),
    Succeeded,
    /// Stopped on `invalid`, `error`, or an unusable address.
    FailedFatal,
    /// Attempt budget spent while the link was not ready.
    FailedExhausted,
}

/// Decision taken after one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Probe again after the delay.
    Continue(Duration),
    Succeed(Status),
    Fail(LinkError),
}

/// Decide what follows attempt `attempt` (1-based).
///
/// `result` is the classified status, or the transport failure when no
/// response came back. `last_status` is the most recent classified status
/// for this host, reported in failures.
pub fn next_step(
    result: Result<Status, FetchError>,
    attempt: u32,
    last_status: Option<Status>,
    retry: &RetryConfig,
) -> Step {
    let exhausted = attempt >= retry.attempts();
    match result {
        Ok(status) if status.is_retryable() => {
            if exhausted {
                Step::Fail(LinkError::new(LinkErrorKind::NotReady, attempt, Some(status)))
            } else {
                Step::Continue(retry.delay(attempt))
            }
        }
        Ok(status) if status.is_fatal() => {
            let kind = match status {
                Status::Error => LinkErrorKind::Error,
                _ => LinkErrorKind::Invalid,
            };
            Step::Fail(LinkError::new(kind, attempt, Some(status)))
        }
        Ok(status) => Step::Succeed(status),
        Err(cause) if !cause.is_transient() => Step::Fail(LinkError::from_fetch(
            LinkErrorKind::Invalid,
            attempt,
            last_status,
            cause,
        )),
        Err(cause) => {
            if exhausted {
                Step::Fail(LinkError::from_fetch(
                    LinkErrorKind::NotReady,
                    attempt,
                    last_status,
                    cause,
                ))
            } else {
                Step::Continue(retry.delay(attempt))
            }
        }
    }
}

/// Drives one host from first probe to a terminal state.
#[derive(Debug)]
pub struct LinkPoller {
    host: Host,
    index: usize,
    context: Arc<ProbeContext>,
    fetcher: HttpFetcher,
    fetch_override: Option<FetchOverride>,
    state: PollState,
    last_status: Option<Status>,
}

impl LinkPoller {
    /// `index` is the position of `host` in the wait call, as reported to
    /// fetch overrides.
    pub fn new(
        host: Host,
        index: usize,
        context: Arc<ProbeContext>,
        fetcher: HttpFetcher,
        fetch_override: Option<FetchOverride>,
    ) -> Self {
        Self {
            host,
            index,
            context,
            fetcher,
            fetch_override,
            state: PollState::Probing(0),
            last_status: None,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Most recent classified status, if any probe got a response.
    pub fn last_status(&self) -> Option<Status> {
        self.last_status
    }

    /// Poll until the host is online, fails fatally, or exhausts its budget.
    pub async fn run(&mut self) -> PollOutcome {
        let retry = self.context.retry.clone();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.state = PollState::Probing(attempt);

            let result = self.probe(attempt).await.map(|raw| raw.classify());
            if let Ok(status) = &result {
                self.last_status = Some(*status);
            }
            debug!(host = %self.host, attempt, result = ?result, "link probe finished");

            match next_step(result, attempt, self.last_status, &retry) {
                Step::Continue(delay) => {
                    self.state = PollState::Retrying(attempt);
                    debug!(host = %self.host, attempt, ?delay, "link not ready, retrying");
                    tokio::time::sleep(delay).await;
                }
                Step::Succeed(status) => {
                    self.state = PollState::Succeeded;
                    info!(host = %self.host, attempts = attempt, "link online");
                    return Ok(status);
                }
                Step::Fail(err) => {
                    self.state = match err.kind {
                        LinkErrorKind::NotReady => PollState::FailedExhausted,
                        LinkErrorKind::Invalid | LinkErrorKind::Error => PollState::FailedFatal,
                    };
                    warn!(host = %self.host, code = err.code(), error = %err, "link failed");
                    return Err(err);
                }
            }
        }
    }

    /// One attempt: the override first, the network when it declines.
    async fn probe(&self, attempt: u32) -> Probe {
        if let Some(fetch_override) = &self.fetch_override {
            let req = ProbeRequest {
                host: self.host.clone(),
                index: self.index,
                attempt,
                context: Arc::clone(&self.context),
            };
            if let Some(answer) = fetch_override.call(req).await {
                return answer;
            }
            debug!(host = %self.host, attempt, "fetch override declined, probing network");
        }
        self.fetcher.fetch(&self.host, &self.context.path).await
    }
}
