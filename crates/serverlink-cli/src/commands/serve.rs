use std::net::SocketAddr;
use std::process::ExitCode;

use tracing::info;

use serverlink_core::Status;
use serverlink_responder::LinkStatus;

pub async fn run(port: u16, path: &str, status: Status) -> anyhow::Result<ExitCode> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
    };

    serverlink_responder::serve(listener, LinkStatus::new(status), path, shutdown).await?;
    info!("link responder stopped");
    Ok(ExitCode::SUCCESS)
}
