use std::process::ExitCode;

use clap::{Parser, Subcommand};

use serverlink_core::Status;

mod commands;

#[derive(Parser)]
#[command(
    name = "serverlink",
    about = "Serverlink: wait until remote links report ready",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Block until every host reports `online`.
    ///
    /// One host waits in single mode; several hosts wait concurrently and
    /// report every host's outcome. Exits non-zero if any host failed.
    Wait(commands::wait::WaitArgs),
    /// Probe a host once and print its status
    Get {
        /// Link address (host:port)
        host: String,
        /// Status path
        #[arg(short, long)]
        path: Option<String>,
    },
    /// Advertise a fixed status until interrupted
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "9000")]
        port: u16,
        /// Status path
        #[arg(short, long, default_value = serverlink_core::DEFAULT_PATH)]
        path: String,
        /// Status to advertise: offline, starting, online, error
        #[arg(short, long, default_value = "online")]
        status: Status,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,serverlink=info".parse().unwrap());
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Wait(args) => commands::wait::run(args).await,
        Commands::Get { host, path } => commands::get::run(&host, path.as_deref()).await,
        Commands::Serve { port, path, status } => commands::serve::run(port, &path, status).await,
    }
}
