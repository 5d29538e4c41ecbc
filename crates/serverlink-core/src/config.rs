//! serverlink.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::{DEFAULT_PATH, Host};

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings for waiting on a set of links.
///
/// Every field is optional in the file; omitted fields take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Status path probed on every host.
    pub path: String,
    /// Hosts waited on when none are given on the command line.
    pub hosts: Vec<Host>,
    /// Upper bound on a single probe, connect through body.
    #[serde(with = "duration_str")]
    pub probe_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_string(),
            hosts: Vec::new(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }
}

impl LinkConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: LinkConfig = toml::from_str(content)?;
        config.retry.validate()?;
        if !config.path.starts_with('/') {
            anyhow::bail!("status path must start with '/': {:?}", config.path);
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.trim().parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.trim().parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Serde adapter storing a `Duration` as a `parse_duration` string.
pub(crate) mod duration_str {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = value.as_millis();
        if millis % 1000 == 0 {
            serializer.serialize_str(&format!("{}s", millis / 1000))
        } else {
            serializer.serialize_str(&format!("{millis}ms"))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid duration {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parse_duration_milliseconds() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_minutes() {
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn parse_duration_plain_number_as_seconds() {
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("-1s"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("307445734561825861m"), None);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = LinkConfig::from_toml("").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.path, "/serverlink");
    }

    #[test]
    fn parses_full_file() {
        let config = LinkConfig::from_toml(
            r#"
path = "/mylink"
probe_timeout = "750ms"
hosts = ["localhost:9000", "localhost:9001"]

[retry]
max_attempts = 3
min_delay = "500ms"
max_delay = "5s"
factor = 1.5
"#,
        )
        .unwrap();
        assert_eq!(config.path, "/mylink");
        assert_eq!(config.probe_timeout, Duration::from_millis(750));
        assert_eq!(config.hosts, vec!["localhost:9000", "localhost:9001"]);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_delay, Duration::from_secs(5));
        assert_eq!(config.retry.factor, 1.5);
    }

    #[test]
    fn rejects_invalid_retry_policy() {
        let err = LinkConfig::from_toml("[retry]\nmax_attempts = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn rejects_relative_path() {
        assert!(LinkConfig::from_toml("path = \"serverlink\"").is_err());
    }

    #[test]
    fn rejects_bad_duration() {
        assert!(LinkConfig::from_toml("probe_timeout = \"later\"").is_err());
        assert!(LinkConfig::from_toml("probe_timeout = \"307445734561825861m\"").is_err());
    }

    #[test]
    fn toml_round_trip_keeps_durations() {
        let mut config = LinkConfig::default();
        config.retry.min_delay = Duration::from_millis(250);
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("250ms"));
        assert_eq!(LinkConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hosts = [\"svc:8080\"]").unwrap();
        let config = LinkConfig::from_file(file.path()).unwrap();
        assert_eq!(config.hosts, vec!["svc:8080"]);
    }
}
