//! Broker connectivity, submission and monitoring configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Broker adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    /// Deterministic in-process broker.
    Simulated,
    /// Generic REST broker.
    Http,
}

/// Broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Adapter used by the CLI.
    #[serde(default = "default_kind")]
    pub kind: BrokerKind,
    /// Base URL of the REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Application key used to obtain session tokens.
    #[serde(default, skip_serializing)]
    pub app_key: String,
    /// Application secret used to obtain session tokens.
    #[serde(default, skip_serializing)]
    pub app_secret: String,
    /// Account identifier.
    #[serde(default)]
    pub account_id: String,
    /// Deadline of a single broker call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Refresh tokens this many seconds before they expire.
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u64,
    /// Whether the broker deduplicates submissions by client order id.
    #[serde(default)]
    pub idempotent_submission: bool,
    /// Submission budget shared by all orders.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
    /// Orders submitted concurrently.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Retry policy for retryable calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            base_url: default_base_url(),
            app_key: String::new(),
            app_secret: String::new(),
            account_id: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            token_refresh_margin_secs: default_token_refresh_margin_secs(),
            idempotent_submission: false,
            requests_per_second: default_requests_per_second(),
            max_in_flight: default_max_in_flight(),
            retry: RetryConfig::default(),
        }
    }
}

impl BrokerConfig {
    /// Deadline of a single broker call.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

const fn default_kind() -> BrokerKind {
    BrokerKind::Simulated
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

const fn default_request_timeout_ms() -> u64 {
    5_000
}

const fn default_token_refresh_margin_secs() -> u64 {
    60
}

const fn default_requests_per_second() -> f64 {
    5.0
}

const fn default_max_in_flight() -> usize {
    4
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts after the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Growth factor per attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Jitter as a fraction of the backoff (±).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}

/// Order monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between polls of in-flight orders.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl MonitorConfig {
    /// Interval between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}
