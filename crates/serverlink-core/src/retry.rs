//! Per-host retry policy with exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::duration_str;

/// Governs one host's attempt cadence and ceiling.
///
/// After attempt `n` fails with a retryable result the poller sleeps
/// `min(max_delay, min_delay * factor^(n-1))` before attempt `n + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total probes allowed per host, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    #[serde(with = "duration_str")]
    pub min_delay: Duration,
    /// Upper bound on any single delay.
    #[serde(with = "duration_str")]
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 11,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
        }
    }
}

/// Rejected retry policy values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryConfigError {
    #[error("max_attempts must be at least 1")]
    NoAttempts,

    #[error("backoff factor must be a positive finite number, got {0}")]
    Factor(f64),

    #[error("min_delay ({min:?}) exceeds max_delay ({max:?})")]
    DelayRange { min: Duration, max: Duration },
}

impl RetryConfig {
    /// Create a policy with the given attempt budget and default delays.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Fixed delay between attempts (`factor` 1).
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            min_delay: delay,
            max_delay: delay,
            factor: 1.0,
        }
    }

    /// Attempt budget, never less than one probe.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff delay to wait after failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.min_delay.as_secs_f64() * self.factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled.max(0.0))
    }

    /// Check the policy for values that cannot drive a poll loop.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::NoAttempts);
        }
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(RetryConfigError::Factor(self.factor));
        }
        if self.min_delay > self.max_delay {
            return Err(RetryConfigError::DelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}
