use std::process::ExitCode;

use serverlink::LinkClient;
use serverlink_core::Status;

/// Print the host's status; succeeds only when it is `online`.
pub async fn run(host: &str, path: Option<&str>) -> anyhow::Result<ExitCode> {
    let status = LinkClient::default().get(host, path).await;
    println!("{status}");
    Ok(if status == Status::Online {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
