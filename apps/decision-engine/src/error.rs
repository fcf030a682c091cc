//! Pipeline-level error taxonomy.
//!
//! Every stage failure that halts a decision cycle is wrapped in a
//! [`PipelineError`], which reports the stage it came from and a stable
//! [`ErrorCode`] for the CLI report and log aggregation.
//!
//! | Code | Stage | Cause |
//! |------|-------|-------|
//! | `CONFIG_INVALID` | config | Unreadable, unparsable or invalid configuration |
//! | `AUDIT_FAILED` | audit | Audit storage unavailable |
//! | `SNAPSHOT_CONFLICT` | audit | A different snapshot already exists for the key |
//! | `QUALITY_GATE_FAILED` | universe | Upstream universe refused or empty |
//! | `SIGNAL_ENGINE_FAILED` | signals | Worker pool could not start |
//! | `INSUFFICIENT_CANDIDATES` | portfolio | Strict candidate count not met |
//! | `INVALID_PORTFOLIO_CONTEXT` | portfolio | Capital or holdings unusable |
//! | `RISK_LIMIT_EXCEEDED` | risk_gate | ENFORCE mode blocked the portfolio |
//! | `RISK_GATE_TIMEOUT` | risk_gate | Risk check missed its deadline |
//! | `BROKER_API_ERROR` | broker | Broker call failed outside per-order handling |
//! | `INTERNAL_ERROR` | internal | Background task failed |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::{AuditError, BrokerError, QualityGateError};
use crate::config::ConfigError;
use crate::domain::portfolio::PortfolioError;
use crate::domain::risk_management::RiskGateViolation;
use crate::domain::signals::SignalError;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Configuration could not be loaded or failed validation.
    ConfigInvalid,
    /// Audit storage failed.
    AuditFailed,
    /// Conflicting decision snapshot.
    SnapshotConflict,
    /// Universe refused by the quality gate.
    QualityGateFailed,
    /// Signal engine could not run.
    SignalEngineFailed,
    /// Too few candidates in strict mode.
    InsufficientCandidates,
    /// Capital or holdings unusable.
    InvalidPortfolioContext,
    /// Risk gate blocked the portfolio.
    RiskLimitExceeded,
    /// Risk gate deadline passed.
    RiskGateTimeout,
    /// Broker failure.
    BrokerApiError,
    /// Unexpected internal failure.
    InternalError,
}

impl ErrorCode {
    /// Reason string for reports.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::AuditFailed => "AUDIT_FAILED",
            Self::SnapshotConflict => "SNAPSHOT_CONFLICT",
            Self::QualityGateFailed => "QUALITY_GATE_FAILED",
            Self::SignalEngineFailed => "SIGNAL_ENGINE_FAILED",
            Self::InsufficientCandidates => "INSUFFICIENT_CANDIDATES",
            Self::InvalidPortfolioContext => "INVALID_PORTFOLIO_CONTEXT",
            Self::RiskLimitExceeded => "RISK_LIMIT_EXCEEDED",
            Self::RiskGateTimeout => "RISK_GATE_TIMEOUT",
            Self::BrokerApiError => "BROKER_API_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Pipeline stage names used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Configuration loading.
    Config,
    /// Audit persistence.
    Audit,
    /// Universe verification.
    Universe,
    /// Signal computation.
    Signals,
    /// Portfolio construction.
    Portfolio,
    /// Pre-trade risk check.
    RiskGate,
    /// Broker interaction.
    Broker,
    /// Runtime plumbing.
    Internal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Audit => "audit",
            Self::Universe => "universe",
            Self::Signals => "signals",
            Self::Portfolio => "portfolio",
            Self::RiskGate => "risk_gate",
            Self::Broker => "broker",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A failure that halted a decision cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Audit storage failure.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Universe refused.
    #[error(transparent)]
    QualityGate(#[from] QualityGateError),

    /// Signal engine failure.
    #[error(transparent)]
    Signals(#[from] SignalError),

    /// Portfolio construction failure.
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// ENFORCE-mode risk gate block.
    #[error(transparent)]
    RiskGate(#[from] RiskGateViolation),

    /// Risk check did not finish in time.
    #[error("risk gate timed out after {timeout_ms}ms")]
    RiskGateTimeout {
        /// Deadline that passed.
        timeout_ms: u64,
    },

    /// Broker failure outside per-order handling.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Background task failure.
    #[error("internal error: {message}")]
    Internal {
        /// Error details.
        message: String,
    },
}

impl PipelineError {
    /// Stage that failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Audit(_) => Stage::Audit,
            Self::QualityGate(_) => Stage::Universe,
            Self::Signals(_) => Stage::Signals,
            Self::Portfolio(_) => Stage::Portfolio,
            Self::RiskGate(_) | Self::RiskGateTimeout { .. } => Stage::RiskGate,
            Self::Broker(_) => Stage::Broker,
            Self::Internal { .. } => Stage::Internal,
        }
    }

    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::Audit(AuditError::SnapshotConflict { .. }) => ErrorCode::SnapshotConflict,
            Self::Audit(_) => ErrorCode::AuditFailed,
            Self::QualityGate(_) => ErrorCode::QualityGateFailed,
            Self::Signals(_) => ErrorCode::SignalEngineFailed,
            Self::Portfolio(PortfolioError::InsufficientCandidates { .. }) => {
                ErrorCode::InsufficientCandidates
            }
            Self::Portfolio(_) => ErrorCode::InvalidPortfolioContext,
            Self::RiskGate(_) => ErrorCode::RiskLimitExceeded,
            Self::RiskGateTimeout { .. } => ErrorCode::RiskGateTimeout,
            Self::Broker(_) => ErrorCode::BrokerApiError,
            Self::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Serializable summary for the CLI report.
    #[must_use]
    pub fn to_report(&self) -> ErrorReport {
        let details = match self {
            Self::Config(err) => err
                .validation_errors()
                .iter()
                .map(ToString::to_string)
                .collect(),
            _ => Vec::new(),
        };
        ErrorReport {
            code: self.code(),
            stage: self.stage(),
            message: self.to_string(),
            details,
        }
    }
}

/// Serializable form of a [`PipelineError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Stable code.
    pub code: ErrorCode,
    /// Failed stage.
    pub stage: Stage,
    /// Error message.
    pub message: String,
    /// Individual causes, e.g. every failed config rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}
