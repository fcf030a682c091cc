//! Retry policy with exponential backoff for broker calls.
//!
//! # Retryable Errors
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | HTTP 429 (Rate Limited) | HTTP 400 (Bad Request) |
//! | HTTP 408, 5xx | HTTP 401/403 (Auth Errors) |
//! | Network timeouts | HTTP 422 (Validation Error) |
//! | Connection reset | Order rejected by broker |
//!
//! The classification itself lives on [`BrokerError::is_retryable`].
//!
//! [`BrokerError::is_retryable`]: crate::application::ports::BrokerError::is_retryable

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RetryConfig;

/// Retry policy for broker calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerRetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff.
    pub max_backoff: Duration,
    /// Growth factor per retry.
    pub backoff_multiplier: f64,
    /// Jitter as a fraction of the backoff (0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for BrokerRetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BrokerRetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter_factor: config.jitter_factor,
        }
    }
}

impl BrokerRetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }
}

/// Calculator for exponential backoff with jitter.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    current_attempt: u32,
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoffCalculator {
    /// Create a calculator from a retry policy.
    #[must_use]
    pub const fn new(policy: &BrokerRetryPolicy) -> Self {
        Self {
            current_attempt: 0,
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Next backoff with jitter, `None` once retries are exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }

        let base_ms = self.base_backoff_ms();
        let capped_ms = self.apply_jitter(base_ms).min(self.max_backoff_ms);
        self.current_attempt += 1;

        Some(Duration::from_millis(capped_ms))
    }

    fn base_backoff_ms(&self) -> u64 {
        let multiplier = self.backoff_multiplier.powi(self.current_attempt as i32);
        let backoff = (self.initial_backoff_ms as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms)
    }

    /// Random value in `[backoff * (1 - jitter), backoff * (1 + jitter)]`.
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 || backoff_ms == 0 {
            return backoff_ms;
        }
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;
        rand::rng().random_range(min..=max) as u64
    }

    /// Retries taken so far.
    #[must_use]
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Whether another retry is allowed.
    #[must_use]
    pub const fn has_remaining_attempts(&self) -> bool {
        self.current_attempt < self.max_attempts
    }
}

/// Parse a `Retry-After` header given in seconds.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, initial_ms: u64, max_ms: u64, multiplier: f64) -> BrokerRetryPolicy {
        BrokerRetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(initial_ms),
            max_backoff: Duration::from_millis(max_ms),
            backoff_multiplier: multiplier,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn policy_follows_config() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_backoff_ms: 250,
            max_backoff_ms: 8_000,
            backoff_multiplier: 3.0,
            jitter_factor: 0.1,
        };
        let policy = BrokerRetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
        assert_eq!(policy.max_backoff, Duration::from_secs(8));
    }

    #[test]
    fn backoff_doubles_until_exhausted() {
        let mut backoff = ExponentialBackoffCalculator::new(&policy(4, 100, 30_000, 2.0));

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(800)));
        assert!(backoff.next_backoff().is_none());
        assert!(!backoff.has_remaining_attempts());
    }

    #[test]
    fn backoff_is_capped() {
        let mut backoff = ExponentialBackoffCalculator::new(&policy(5, 1_000, 5_000, 10.0));

        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn jitter_stays_in_band() {
        let mut p = policy(50, 1_000, 1_000, 1.0);
        p.jitter_factor = 0.2;
        let mut backoff = ExponentialBackoffCalculator::new(&p);
        while let Some(delay) = backoff.next_backoff() {
            assert!(delay >= Duration::from_millis(800));
            assert!(delay <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn none_policy_never_retries() {
        let mut backoff = ExponentialBackoffCalculator::new(&BrokerRetryPolicy::none());
        assert!(backoff.next_backoff().is_none());
    }

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 10 "), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
