//! Requeue policy for transient download failures

use crate::config::CrawlerConfig;
use std::time::Duration;

/// Fixed-delay retry policy with an optional attempt limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` of `None` retries forever
    pub fn new(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.requeue_delay_ms),
            config.max_attempts,
        )
    }

    /// Pause before the next attempt; the same every time
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns true if another attempt should follow attempt number `attempt`
    ///
    /// Attempts are numbered from 1.
    pub fn should_retry(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }
}
