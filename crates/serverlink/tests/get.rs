//! One-shot `get` probes against a live responder.

use std::time::Duration;

use axum::Router;

use serverlink::{HttpFetcher, MAX_BODY_BYTES, Status, get};
use serverlink_responder::{LinkStatus, spawn_local};

#[tokio::test]
async fn get_reports_server_status() {
    // Nothing listens on port 1.
    assert_eq!(get("127.0.0.1:1", None).await, Status::Offline);

    let status = LinkStatus::new(Status::Starting);
    let (addr, handle) = spawn_local(status.clone(), None).await.unwrap();
    let host = addr.to_string();

    assert_eq!(get(&host, None).await, Status::Starting);

    status.set(Status::Online);
    assert_eq!(get(&host, None).await, Status::Online);

    status.set(Status::Error);
    assert_eq!(get(&host, None).await, Status::Error);

    handle.abort();
}

#[tokio::test]
async fn get_on_custom_path() {
    let status = LinkStatus::new(Status::Offline);
    let (addr, handle) = spawn_local(status, Some("/health/link")).await.unwrap();
    let host = format!("http://{addr}");

    assert_eq!(get(&host, Some("/health/link")).await, Status::Offline);
    // The default path is not served: 404 is unrecognized.
    assert_eq!(get(&host, None).await, Status::Invalid);

    handle.abort();
}

#[tokio::test]
async fn get_never_fails_on_bad_addresses() {
    for host in ["", "https://secure:443", "http://", "not a host:99999"] {
        assert_eq!(get(host, None).await, Status::Offline, "host {host:?}");
    }
}

#[tokio::test]
async fn oversized_body_is_invalid() {
    let router = Router::new().fallback(|| async { "online".repeat(10_000) });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let raw = HttpFetcher::new(Duration::from_secs(2))
        .fetch(&host, "/serverlink")
        .await
        .unwrap();
    assert_eq!(raw.code, 200);
    assert!(raw.body.len() <= MAX_BODY_BYTES, "read {} bytes", raw.body.len());
    assert_eq!(raw.classify(), Status::Invalid);
    assert_eq!(get(&host, None).await, Status::Invalid);

    handle.abort();
}
