use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use serde::Serialize;
use tracing::info;

use serverlink::{LinkClient, LinkError, PollOutcome, Ready, Targets, WaitError, WaitOptions};
use serverlink_core::{Host, LinkConfig, Status, parse_duration};

#[derive(Args, Debug, Default)]
pub struct WaitArgs {
    /// Link addresses (host:port); defaults to `hosts` from the config file
    pub hosts: Vec<String>,
    /// serverlink.toml to read defaults from
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Status path
    #[arg(short, long)]
    pub path: Option<String>,
    /// Total probes per host
    #[arg(long)]
    pub max_attempts: Option<u32>,
    /// Delay after the first failed probe, e.g. 500ms
    #[arg(long)]
    pub min_delay: Option<String>,
    /// Upper bound on a single delay, e.g. 30s
    #[arg(long)]
    pub max_delay: Option<String>,
    /// Backoff growth factor
    #[arg(long)]
    pub factor: Option<f64>,
    /// Bound on each probe, e.g. 2s
    #[arg(long)]
    pub timeout: Option<String>,
    /// Give up on the whole wait after this long, e.g. 5m
    #[arg(long)]
    pub deadline: Option<String>,
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Per-host line of the wait report.
#[derive(Debug, Serialize, PartialEq)]
struct LinkReport {
    host: Host,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl LinkReport {
    fn new(host: &str, outcome: &PollOutcome) -> Self {
        match outcome {
            Ok(status) => Self {
                host: host.to_string(),
                status: Some(*status),
                code: None,
                attempts: None,
                message: None,
            },
            Err(err) => Self::failed(host, err),
        }
    }

    fn failed(host: &str, err: &LinkError) -> Self {
        Self {
            host: host.to_string(),
            status: err.last_status,
            code: Some(err.code()),
            attempts: Some(err.attempts),
            message: Some(err.message.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct WaitReport {
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    links: Vec<LinkReport>,
}

pub async fn run(args: WaitArgs) -> anyhow::Result<ExitCode> {
    let (hosts, options, deadline) = resolve(&args)?;

    let targets = if hosts.len() == 1 {
        Targets::One(hosts[0].clone())
    } else {
        Targets::Many(hosts.clone())
    };

    info!(hosts = hosts.len(), path = %options.path(), "waiting for server links");
    let client = LinkClient::default();
    let result = match deadline {
        Some(limit) => match tokio::time::timeout(limit, client.wait(targets, &options)).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("server links not ready within {limit:?}"),
        },
        None => client.wait(targets, &options).await,
    };

    let report = build_report(&hosts, &result);
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", format_report(&report)),
    }

    Ok(if report.ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Merge the config file (if any) with command-line overrides.
fn resolve(args: &WaitArgs) -> anyhow::Result<(Vec<Host>, WaitOptions, Option<Duration>)> {
    let mut config = match &args.config {
        Some(path) => LinkConfig::from_file(path)?,
        None => LinkConfig::default(),
    };

    if !args.hosts.is_empty() {
        config.hosts = args.hosts.clone();
    }
    if config.hosts.is_empty() {
        anyhow::bail!("no hosts to wait on; pass them as arguments or set `hosts` in the config");
    }
    if let Some(path) = &args.path {
        config.path = path.clone();
    }
    if let Some(n) = args.max_attempts {
        config.retry.max_attempts = n;
    }
    if let Some(raw) = &args.min_delay {
        config.retry.min_delay = duration_arg("--min-delay", raw)?;
    }
    if let Some(raw) = &args.max_delay {
        config.retry.max_delay = duration_arg("--max-delay", raw)?;
    }
    if let Some(factor) = args.factor {
        config.retry.factor = factor;
    }
    if let Some(raw) = &args.timeout {
        config.probe_timeout = duration_arg("--timeout", raw)?;
    }
    config.retry.validate()?;

    let deadline = args
        .deadline
        .as_deref()
        .map(|raw| duration_arg("--deadline", raw))
        .transpose()?;

    let options = WaitOptions::from(&config);
    Ok((config.hosts, options, deadline))
}

fn duration_arg(flag: &str, raw: &str) -> anyhow::Result<Duration> {
    parse_duration(raw).ok_or_else(|| anyhow::anyhow!("{flag}: invalid duration {raw:?}"))
}

fn build_report(hosts: &[Host], result: &Result<Ready, WaitError>) -> WaitReport {
    match result {
        Ok(Ready::One(status)) => WaitReport {
            ready: true,
            code: None,
            links: vec![LinkReport::new(&hosts[0], &Ok(*status))],
        },
        Ok(Ready::Many(statuses)) => WaitReport {
            ready: true,
            code: None,
            links: hosts
                .iter()
                .zip(statuses)
                .map(|(host, status)| LinkReport::new(host, &Ok(*status)))
                .collect(),
        },
        Err(WaitError::Link(err)) => WaitReport {
            ready: false,
            code: Some(err.code()),
            links: vec![LinkReport::failed(&hosts[0], err)],
        },
        Err(WaitError::LinksNotReady(agg)) => WaitReport {
            ready: false,
            code: Some(serverlink::LinksNotReady::CODE),
            links: agg
                .hosts
                .iter()
                .zip(&agg.outcomes)
                .map(|(host, outcome)| LinkReport::new(host, outcome))
                .collect(),
        },
    }
}

fn format_report(report: &WaitReport) -> String {
    let width = report.links.iter().map(|l| l.host.len()).max().unwrap_or(0);
    let mut out = String::new();
    for link in &report.links {
        match (&link.code, &link.message) {
            (Some(code), Some(message)) => {
                out.push_str(&format!("✗ {:width$}  {code}  {message}\n", link.host));
            }
            _ => {
                let status = link.status.map_or("online", Status::as_str);
                out.push_str(&format!("✓ {:width$}  {status}\n", link.host));
            }
        }
    }
    out
}
