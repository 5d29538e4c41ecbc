//! Probe strategies: the default HTTP fetcher and caller overrides.
//!
//! A probe yields either a [`RawResponse`] or a [`FetchError`] when no
//! response could be obtained. A [`FetchOverride`] may answer any attempt
//! itself; when it declines (returns `None`) the [`HttpFetcher`] runs for
//! that same attempt.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::debug;

use serverlink_core::config::DEFAULT_PROBE_TIMEOUT;
use serverlink_core::{Host, RetryConfig};

use crate::classify::RawResponse;
use crate::error::FetchError;

/// Result of one probe attempt.
pub type Probe = Result<RawResponse, FetchError>;

/// Largest response body read from a link; longer bodies classify as
/// `invalid`.
pub const MAX_BODY_BYTES: usize = 64;

/// Boxed future returned by a [`FetchOverride`].
pub type ProbeFuture = Pin<Box<dyn Future<Output = Option<Probe>> + Send>>;

/// Performs single HTTP/1.1 GET probes against link hosts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    user_agent: String,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl HttpFetcher {
    /// Create a fetcher bounding each probe (connect through body) by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: concat!("serverlink/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one GET to `host + path`.
    pub async fn fetch(&self, host: &str, path: &str) -> Probe {
        let target = Target::parse(host, path)?;
        let result = tokio::time::timeout(self.timeout, self.exchange(&target)).await;
        match result {
            Ok(result) => result,
            Err(_) => {
                debug!(address = %target.authority, "link probe timed out");
                Err(FetchError::Timeout {
                    address: target.authority,
                    timeout: self.timeout,
                })
            }
        }
    }

    async fn exchange(&self, target: &Target) -> Probe {
        let address = &target.authority;

        let stream = TcpStream::connect(&target.connect_addr)
            .await
            .map_err(|e| {
                debug!(error = %e, %address, "link probe connection failed");
                FetchError::Connect {
                    address: address.clone(),
                    reason: e.to_string(),
                }
            })?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| FetchError::Handshake {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = Request::builder()
            .method(Method::GET)
            .uri(target.uri.path_and_query().map_or("/", |p| p.as_str()))
            .header(HOST, address.as_str())
            .header(USER_AGENT, self.user_agent.as_str())
            .body(Empty::<Bytes>::new())
            .map_err(|e| FetchError::InvalidAddress {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        let resp = sender.send_request(req).await.map_err(|e| {
            debug!(error = %e, %address, "link probe request failed");
            FetchError::Request {
                address: address.clone(),
                reason: e.to_string(),
            }
        })?;

        let code = resp.status().as_u16();
        let body = match Limited::new(resp.into_body(), MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                // Too long to name any status.
                debug!(%address, limit = MAX_BODY_BYTES, "link response body too large");
                Bytes::new()
            }
            Err(e) => {
                return Err(FetchError::Body {
                    address: address.clone(),
                    reason: e.to_string(),
                });
            }
        };

        Ok(RawResponse::new(code, String::from_utf8_lossy(&body)))
    }
}

/// Where a host string points.
#[derive(Debug)]
struct Target {
    uri: Uri,
    authority: String,
    connect_addr: String,
}

impl Target {
    /// Accepts `host:port`, `http://host:port` and either with a base path.
    fn parse(host: &str, path: &str) -> Result<Self, FetchError> {
        let invalid = |reason: &str| FetchError::InvalidAddress {
            address: host.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = host.trim();
        let rest = match trimmed.split_once("://") {
            None => trimmed,
            Some(("http", rest)) => rest,
            Some((scheme, _)) => {
                return Err(invalid(&format!("unsupported scheme {scheme:?}")));
            }
        };

        let (authority, base) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(invalid("missing host"));
        }

        let mut full_path = format!("{}{path}", base.trim_end_matches('/'));
        if !full_path.starts_with('/') {
            full_path.insert(0, '/');
        }

        let uri = Uri::builder()
            .scheme("http")
            .authority(authority)
            .path_and_query(full_path)
            .build()
            .map_err(|e| invalid(&e.to_string()))?;

        let hostname = uri.host().ok_or_else(|| invalid("missing host"))?;
        let port = uri.port_u16().unwrap_or(80);
        let connect_addr = format!("{hostname}:{port}");

        Ok(Self {
            authority: authority.to_string(),
            connect_addr,
            uri,
        })
    }
}

/// Read-only view of the wait call an override is answering for.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeContext {
    pub hosts: Vec<Host>,
    pub path: String,
    pub retry: RetryConfig,
}

/// One attempt an override is asked to answer.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub host: Host,
    /// Position of `host` in the wait call's host list.
    pub index: usize,
    /// 1-based attempt number for this host.
    pub attempt: u32,
    pub context: Arc<ProbeContext>,
}

/// Caller-supplied probe strategy.
///
/// Returning `None` for an attempt hands that attempt to the network
/// probe. Build one from a plain closure with [`FetchOverride::new`] or
/// from an async closure with [`FetchOverride::deferred`]; the poller
/// treats both the same.
#[derive(Clone)]
pub struct FetchOverride(Arc<dyn Fn(ProbeRequest) -> ProbeFuture + Send + Sync>);

impl FetchOverride {
    /// Override answering synchronously.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ProbeRequest) -> Option<Probe> + Send + Sync + 'static,
    {
        Self(Arc::new(move |req: ProbeRequest| -> ProbeFuture {
            let answer = f(&req);
            Box::pin(std::future::ready(answer))
        }))
    }

    /// Override answering with a future.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(ProbeRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Probe>> + Send + 'static,
    {
        Self(Arc::new(move |req: ProbeRequest| -> ProbeFuture { Box::pin(f(req)) }))
    }

    pub(crate) fn call(&self, req: ProbeRequest) -> ProbeFuture {
        (self.0)(req)
    }
}

impl fmt::Debug for FetchOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FetchOverride(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_from_bare_host_port() {
        let t = Target::parse("localhost:9000", "/serverlink").unwrap();
        assert_eq!(t.authority, "localhost:9000");
        assert_eq!(t.connect_addr, "localhost:9000");
        assert_eq!(t.uri.path(), "/serverlink");
    }

    #[test]
    fn target_with_scheme_and_base_path() {
        let t = Target::parse("http://svc:8080/base/", "/serverlink").unwrap();
        assert_eq!(t.authority, "svc:8080");
        assert_eq!(t.uri.path(), "/base/serverlink");
    }

    #[test]
    fn target_defaults_to_port_80() {
        let t = Target::parse("svc", "/serverlink").unwrap();
        assert_eq!(t.connect_addr, "svc:80");
    }

    #[test]
    fn target_rejects_https_and_empty() {
        assert!(matches!(
            Target::parse("https://svc:443", "/serverlink"),
            Err(FetchError::InvalidAddress { .. })
        ));
        assert!(matches!(
            Target::parse("", "/serverlink"),
            Err(FetchError::InvalidAddress { .. })
        ));
        assert!(matches!(
            Target::parse("http:///serverlink", "/serverlink"),
            Err(FetchError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_to_closed_port_is_transient() {
        let fetcher = HttpFetcher::new(Duration::from_millis(500));
        let err = fetcher.fetch("127.0.0.1:1", "/serverlink").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error {err:?}");
    }

    #[tokio::test]
    async fn sync_and_deferred_overrides_answer_alike() {
        let context = Arc::new(ProbeContext {
            hosts: vec!["custom".to_string()],
            path: "/serverlink".to_string(),
            retry: RetryConfig::default(),
        });
        let req = ProbeRequest {
            host: "custom".to_string(),
            index: 0,
            attempt: 1,
            context,
        };

        let literal = FetchOverride::new(|_| Some(Ok(RawResponse::ok("online"))));
        let deferred = FetchOverride::deferred(|_| async { Some(Ok(RawResponse::ok("online"))) });

        assert_eq!(
            literal.call(req.clone()).await,
            deferred.call(req).await
        );
    }
}
