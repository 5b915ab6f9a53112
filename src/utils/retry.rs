//! Exponential backoff for operations retried until they succeed
//!
//! [`RetryConfig`] describes the delay curve. [`Backoff`] is the state kept
//! between attempts by a long-lived retry loop; it grows on every failure and
//! returns to the base delay after a success.

use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with custom delays
    pub fn with_delays(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            ..Default::default()
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate delay for a given attempt using exponential backoff
    ///
    /// Attempt 0 is the first try and has no delay.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
            let exponential = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
            if exponential.is_finite() {
                (exponential as u64).min(self.max_delay_ms)
            } else {
                self.max_delay_ms
            }
        };

        Duration::from_millis(delay_ms)
    }
}

/// Backoff state carried across attempts
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    failures: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.config.calculate_delay(self.failures)
    }

    /// Delay the next failure would produce
    pub fn peek(&self) -> Duration {
        self.config.calculate_delay(self.failures.saturating_add(1))
    }

    /// Consecutive failures since the last success
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Return to the base delay after a success
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
