//! Client configuration.

use std::time::Duration;

/// How often and how patiently a call is retried after a retriable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Sleep before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub retry: RetryPolicy,
    /// Fail calls whose reply carries more fields than declared outputs.
    /// Off by default: extra fields are ignored so older clients keep working
    /// against newer services.
    pub strict_outputs: bool,
}

impl ClientConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    pub fn with_strict_outputs(mut self, strict: bool) -> Self {
        self.strict_outputs = strict;
        self
    }
}
