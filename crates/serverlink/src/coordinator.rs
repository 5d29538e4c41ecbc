//! Concurrent wait across hosts with all-settle aggregation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use serverlink_core::config::DEFAULT_PROBE_TIMEOUT;
use serverlink_core::{DEFAULT_PATH, Host, LinkConfig, RetryConfig, Status};

use crate::error::{LinkError, LinksNotReady, PollOutcome, WaitError};
use crate::fetch::{FetchOverride, HttpFetcher, ProbeContext};
use crate::poller::LinkPoller;

/// Named options for one wait call.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Status path; `/serverlink` when unset.
    pub path: Option<String>,
    pub retry: RetryConfig,
    pub fetch_override: Option<FetchOverride>,
    /// Bound on each network probe.
    pub probe_timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            path: None,
            retry: RetryConfig::default(),
            fetch_override: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl WaitOptions {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_override(mut self, fetch_override: FetchOverride) -> Self {
        self.fetch_override = Some(fetch_override);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(DEFAULT_PATH)
    }
}

impl From<&LinkConfig> for WaitOptions {
    fn from(config: &LinkConfig) -> Self {
        Self {
            path: Some(config.path.clone()),
            retry: config.retry.clone(),
            fetch_override: None,
            probe_timeout: config.probe_timeout,
        }
    }
}

/// Hosts to wait on; the variant picks the result shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Single mode: resolves to one status or that host's own error.
    One(Host),
    /// Multi mode: resolves to one status per host or an aggregate error.
    Many(Vec<Host>),
}

impl From<&str> for Targets {
    fn from(host: &str) -> Self {
        Targets::One(host.to_string())
    }
}

impl From<String> for Targets {
    fn from(host: String) -> Self {
        Targets::One(host)
    }
}

impl From<Vec<Host>> for Targets {
    fn from(hosts: Vec<Host>) -> Self {
        Targets::Many(hosts)
    }
}

impl From<&[&str]> for Targets {
    fn from(hosts: &[&str]) -> Self {
        Targets::Many(hosts.iter().map(|h| h.to_string()).collect())
    }
}

/// Successful wait, shaped like its [`Targets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ready {
    One(Status),
    Many(Vec<Status>),
}

/// Entry point for probing and waiting on links.
///
/// Cheap to clone; holds only the network fetcher settings. Waits take
/// their probe timeout from [`WaitOptions`] instead of the fetcher.
#[derive(Debug, Clone, Default)]
pub struct LinkClient {
    fetcher: HttpFetcher,
}

impl LinkClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// One best-effort probe. Never fails: an unreachable host is
    /// `Offline`, an unrecognized answer is `Invalid`.
    pub async fn get(&self, host: &str, path: Option<&str>) -> Status {
        let path = path.unwrap_or(DEFAULT_PATH);
        match self.fetcher.fetch(host, path).await {
            Ok(raw) => raw.classify(),
            Err(e) => {
                debug!(%host, error = %e, "link get failed, reporting offline");
                Status::Offline
            }
        }
    }

    /// Wait on one host or several, per the [`Targets`] variant.
    pub async fn wait(
        &self,
        targets: impl Into<Targets>,
        options: &WaitOptions,
    ) -> Result<Ready, WaitError> {
        match targets.into() {
            Targets::One(host) => Ok(Ready::One(self.wait_one(host, options).await?)),
            Targets::Many(hosts) => Ok(Ready::Many(self.wait_all(hosts, options).await?)),
        }
    }

    /// Wait on a single host; its own error is returned unwrapped.
    pub async fn wait_one(
        &self,
        host: impl Into<Host>,
        options: &WaitOptions,
    ) -> Result<Status, LinkError> {
        let outcomes = self.settle(vec![host.into()], options).await;
        outcomes
            .into_iter()
            .next()
            .unwrap_or_else(|| Err(LinkError::aborted("no outcome for host")))
    }

    /// Wait on every host; fails with the full outcome list if any host
    /// did not come online.
    pub async fn wait_all(
        &self,
        hosts: Vec<Host>,
        options: &WaitOptions,
    ) -> Result<Vec<Status>, LinksNotReady> {
        let outcomes = self.settle(hosts.clone(), options).await;
        if outcomes.iter().all(Result::is_ok) {
            return Ok(outcomes.into_iter().flatten().collect());
        }

        let err = LinksNotReady { hosts, outcomes };
        warn!(
            ready = err.ready_count(),
            total = err.outcomes.len(),
            "server links not ready"
        );
        Err(err)
    }

    /// Run one poller per host concurrently and settle them into input order.
    ///
    /// Dropping the returned future aborts every poller still in flight.
    async fn settle(&self, hosts: Vec<Host>, options: &WaitOptions) -> Vec<PollOutcome> {
        let context = Arc::new(ProbeContext {
            hosts,
            path: options.path().to_string(),
            retry: options.retry.clone(),
        });
        let fetcher = self.fetcher.clone().with_timeout(options.probe_timeout);

        debug!(
            hosts = context.hosts.len(),
            path = %context.path,
            max_attempts = context.retry.attempts(),
            "waiting on server links"
        );

        // Dropping the set aborts every poller still running.
        let mut pollers = JoinSet::new();
        for (index, host) in context.hosts.iter().enumerate() {
            let mut poller = LinkPoller::new(
                host.clone(),
                index,
                Arc::clone(&context),
                fetcher.clone(),
                options.fetch_override.clone(),
            );
            pollers.spawn(async move { (index, poller.run().await) });
        }

        let mut slots: Vec<Option<PollOutcome>> = vec![None; context.hosts.len()];
        while let Some(joined) = pollers.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!(error = %e, "link poller aborted"),
            }
        }

        // A slot left empty belongs to a poller that panicked.
        let outcomes: Vec<PollOutcome> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(LinkError::aborted(format_args!(
                        "poller for {} panicked",
                        context.hosts[index]
                    )))
                })
            })
            .collect();

        if outcomes.iter().all(Result::is_ok) && !outcomes.is_empty() {
            info!(hosts = outcomes.len(), "all server links online");
        }
        outcomes
    }
}

/// [`LinkClient::get`] with default fetcher settings.
pub async fn get(host: &str, path: Option<&str>) -> Status {
    LinkClient::default().get(host, path).await
}

/// [`LinkClient::wait`] with default fetcher settings.
pub async fn wait(targets: impl Into<Targets>, options: &WaitOptions) -> Result<Ready, WaitError> {
    LinkClient::default().wait(targets, options).await
}

/// [`LinkClient::wait_one`] with default fetcher settings.
pub async fn wait_one(host: impl Into<Host>, options: &WaitOptions) -> Result<Status, LinkError> {
    LinkClient::default().wait_one(host, options).await
}

/// [`LinkClient::wait_all`] with default fetcher settings.
pub async fn wait_all(hosts: Vec<Host>, options: &WaitOptions) -> Result<Vec<Status>, LinksNotReady> {
    LinkClient::default().wait_all(hosts, options).await
}
