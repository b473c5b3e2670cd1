//! Bounded retry policy for transport failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// Timeout, retry bound and exponential backoff for model calls.
///
/// Retries address transport flakiness only. A response that arrived but
/// grades badly is never retried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries (0 = no retries, call once).
    pub max_retries: u32,
    /// Delay before the first retry (milliseconds); doubles per retry.
    pub backoff_base_ms: u64,
    /// Upper bound on any single backoff delay (milliseconds).
    pub backoff_max_ms: u64,
    /// Maximum wall-clock time for a single attempt (milliseconds).
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 5_000,
            timeout_ms: 300_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that calls once and never waits between attempts.
    pub fn no_retries(timeout_ms: u64) -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
            timeout_ms,
        }
    }

    /// Total attempts allowed (`max_retries + 1`).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(32);
        let ms = self
            .backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }

    /// Full backoff schedule, one entry per possible retry.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|r| self.backoff_for(r)).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "retry.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.backoff_max_ms ({}) is below retry.backoff_base_ms ({})",
                self.backoff_max_ms, self.backoff_base_ms
            )));
        }
        Ok(())
    }
}
