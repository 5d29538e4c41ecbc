//! serverlink-responder: advertise this process's link status over HTTP.
//!
//! [`LinkStatus`] holds the status a process currently advertises and
//! [`link_router`] exposes it as `GET <path>` returning `200` with the
//! status name as plain text, the wire contract probed by `serverlink`.
//!
//! ```text
//! GET /serverlink  →  200 text/plain  "starting"
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use serverlink_core::{DEFAULT_PATH, Status, StatusParseError};

/// The status a process advertises; clones share the same value.
#[derive(Debug, Clone)]
pub struct LinkStatus {
    tx: Arc<watch::Sender<Status>>,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self::new(Status::default())
    }
}

impl LinkStatus {
    pub fn new(initial: Status) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Currently advertised status.
    pub fn get(&self) -> Status {
        *self.tx.borrow()
    }

    pub fn set(&self, status: Status) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            info!(from = %previous, to = %status, "link status changed");
        }
    }

    /// Set from a wire name; anything unrecognized is rejected and the
    /// current status is left as is.
    pub fn set_str(&self, raw: &str) -> Result<(), StatusParseError> {
        self.set(raw.parse()?);
        Ok(())
    }

    /// Observe status changes.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }
}

/// Router answering `GET path` with the current status.
///
/// A path without a leading `/` gets one.
pub fn link_router(status: LinkStatus, path: &str) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Router::new()
        .route(&path, get(report_status))
        .with_state(status)
}

/// GET <path>
async fn report_status(State(status): State<LinkStatus>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        status.get().as_str(),
    )
}

/// Serve the responder on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    status: LinkStatus,
    path: &str,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, %path, status = %status.get(), "link responder listening");
    axum::serve(listener, link_router(status, path))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Bind a responder on an ephemeral loopback port and serve it in the
/// background. The task runs until aborted.
pub async fn spawn_local(
    status: LinkStatus,
    path: Option<&str>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let path = path.unwrap_or(DEFAULT_PATH).to_string();
    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, status, &path, std::future::pending()).await {
            error!(error = %e, "link responder stopped");
        }
    });
    Ok((addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn fetch(router: Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let code = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (code, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn default_status_is_online() {
        assert_eq!(LinkStatus::default().get(), Status::Online);
    }

    #[test]
    fn set_str_rejects_unknown_status() {
        let status = LinkStatus::new(Status::Starting);
        assert!(status.set_str("bogus").is_err());
        assert_eq!(status.get(), Status::Starting);

        status.set_str("online").unwrap();
        assert_eq!(status.get(), Status::Online);
    }

    #[test]
    fn clones_share_status() {
        let status = LinkStatus::new(Status::Starting);
        let other = status.clone();
        other.set(Status::Error);
        assert_eq!(status.get(), Status::Error);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let status = LinkStatus::new(Status::Starting);
        let mut rx = status.subscribe();
        status.set(Status::Online);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Status::Online);
    }

    #[tokio::test]
    async fn router_reports_current_status() {
        let status = LinkStatus::new(Status::Starting);
        let router = link_router(status.clone(), "/serverlink");

        assert_eq!(
            fetch(router.clone(), "/serverlink").await,
            (StatusCode::OK, "starting".to_string())
        );

        status.set(Status::Online);
        assert_eq!(
            fetch(router, "/serverlink").await,
            (StatusCode::OK, "online".to_string())
        );
    }

    #[tokio::test]
    async fn router_uses_custom_path() {
        let router = link_router(LinkStatus::default(), "mystatus");
        assert_eq!(fetch(router.clone(), "/mystatus").await.0, StatusCode::OK);
        assert_eq!(fetch(router, "/serverlink").await.0, StatusCode::NOT_FOUND);
    }
}
