//! Configuration module for the decision engine.
//!
//! One YAML document defines every threshold of the pipeline. Loading
//! interpolates environment variables, parses into typed sections, validates
//! every rule eagerly and computes a canonical hash that is recorded in the
//! decision snapshot.
//!
//! # Usage
//!
//! ```rust,ignore
//! use decision_engine::config::load_config;
//!
//! let document = load_config("config.yaml")?;
//! println!("config hash: {}", document.hash);
//! println!("target holdings: {}", document.config.portfolio.target_holdings);
//! ```

mod broker;
mod execution;
mod observability;
mod portfolio;
mod risk;
mod selection;
mod signals;
mod strategy;
mod validation;

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use broker::{BrokerConfig, BrokerKind, MonitorConfig, RetryConfig};
pub use execution::{ExecutionConfig, SlippageSegment, SplittingConfig, TickBand};
pub use observability::{LoggingConfig, MetricsConfig, ObservabilityConfig};
pub use portfolio::{PortfolioConfig, TierConfig, WEIGHT_SUM_TOLERANCE};
pub use risk::{RiskGateConfig, VarLimit};
pub use selection::{FactorWeights, RankingConfig, ScreeningConfig};
pub use signals::{
    EventConfig, FlowConfig, MomentumConfig, NormalizationConfig, QualityConfig, SignalsConfig,
    TechnicalConfig, ValueConfig,
};
pub use strategy::StrategyConfig;
pub use validation::{ConfigurationError, validate_config};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// One or more validation rules failed.
    #[error("Config validation failed: {}", format_errors(.0))]
    Invalid(Vec<ConfigurationError>),

    /// Failed to produce the canonical form used for hashing.
    #[error("Failed to serialize config for hashing: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    /// Validation failures, empty for other errors.
    #[must_use]
    pub fn validation_errors(&self) -> &[ConfigurationError] {
        match self {
            Self::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

fn format_errors(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Strategy identity.
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Signal engine.
    #[serde(default)]
    pub signals: SignalsConfig,
    /// Screener hard cuts.
    #[serde(default)]
    pub screening: ScreeningConfig,
    /// Ranker weights.
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Portfolio construction.
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    /// Execution planning.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Pre-trade risk gate.
    #[serde(default)]
    pub risk_gate: RiskGateConfig,
    /// Broker connectivity and submission.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Order monitor.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Logging.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// A validated configuration together with its source text and hash.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    /// Typed configuration.
    pub config: Config,
    /// Document as written, before environment interpolation.
    pub raw: String,
    /// Hex SHA-256 of the canonical JSON form.
    pub hash: String,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigDocument, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<ConfigDocument, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;

    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(ConfigError::Invalid(errors));
    }

    let hash = config_hash(&config)?;
    Ok(ConfigDocument {
        config,
        raw: yaml.to_string(),
        hash,
    })
}

/// Stable hash of a configuration.
///
/// The typed configuration is rendered as JSON with sorted object keys, so
/// field order, comments and formatting of the source document do not change
/// the hash. Credentials are never serialized and never hashed.
///
/// # Errors
///
/// Returns an error if the configuration cannot be represented as JSON.
pub fn config_hash(config: &Config) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(config)?;
    let canonical = serde_json::to_string(&sort_keys(value))?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = cap.get(1).map_or("", |m| m.as_str());
        let default_value = cap.get(2).map(|m| m.as_str());

        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}
