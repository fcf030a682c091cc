//! Risk limit violations and the combined outcome of a check.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::shared::InstrumentCode;

/// Violation severity. Only errors count towards blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationSeverity {
    /// Recorded for review, never blocks.
    Warning,
    /// Breach of a configured limit.
    Error,
}

impl fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// What the risk gate found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    /// Portfolio VaR above the configured loss at some confidence.
    VarLimitExceeded,
    /// Single position heavier than `max_position_weight`.
    PositionConcentrationExceeded,
    /// Holding without enough price history for a volatility estimate.
    DefaultVolatilityUsed,
}

impl ViolationCode {
    /// Severity implied by the code.
    #[must_use]
    pub const fn severity(self) -> ViolationSeverity {
        match self {
            Self::VarLimitExceeded | Self::PositionConcentrationExceeded => {
                ViolationSeverity::Error
            }
            Self::DefaultVolatilityUsed => ViolationSeverity::Warning,
        }
    }

    /// Stable code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VarLimitExceeded => "VAR_LIMIT_EXCEEDED",
            Self::PositionConcentrationExceeded => "POSITION_CONCENTRATION_EXCEEDED",
            Self::DefaultVolatilityUsed => "DEFAULT_VOLATILITY_USED",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single limit finding, portfolio-level unless `instrument` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Finding.
    pub code: ViolationCode,
    /// Severity, derived from the code.
    pub severity: ViolationSeverity,
    /// Human-readable message.
    pub message: String,
    /// Offending instrument.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instrument: Option<InstrumentCode>,
    /// Observed value.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub observed: Option<f64>,
    /// Configured limit.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<f64>,
}

impl ConstraintViolation {
    /// Create a violation; severity follows the code.
    #[must_use]
    pub fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            instrument: None,
            observed: None,
            limit: None,
        }
    }

    /// Attach the offending instrument.
    #[must_use]
    pub fn for_instrument(mut self, code: &InstrumentCode) -> Self {
        self.instrument = Some(code.clone());
        self
    }

    /// Attach the observed value and, when one applies, the limit.
    #[must_use]
    pub const fn measured(mut self, observed: f64, limit: Option<f64>) -> Self {
        self.observed = Some(observed);
        self.limit = limit;
        self
    }

    /// Whether this violation counts towards blocking.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self.severity, ViolationSeverity::Error)
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        if let Some(code) = &self.instrument {
            write!(f, " ({code})")?;
        }
        if let (Some(observed), Some(limit)) = (self.observed, self.limit) {
            write!(f, " {observed:.6} > {limit:.6}")?;
        }
        Ok(())
    }
}

/// Findings of one or more checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// Findings in check order.
    pub violations: Vec<ConstraintViolation>,
}

impl ConstraintResult {
    /// Empty result.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    /// Wrap a list of findings.
    #[must_use]
    pub const fn from_violations(violations: Vec<ConstraintViolation>) -> Self {
        Self { violations }
    }

    /// No blocking findings.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.blocking_count() == 0
    }

    /// Number of blocking findings.
    #[must_use]
    pub fn blocking_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_blocking()).count()
    }

    /// Codes of the blocking findings, in order.
    pub fn blocking_codes(&self) -> impl Iterator<Item = ViolationCode> + '_ {
        self.violations
            .iter()
            .filter(|v| v.is_blocking())
            .map(|v| v.code)
    }

    /// Add one finding.
    pub fn add_violation(&mut self, violation: ConstraintViolation) {
        self.violations.push(violation);
    }

    /// Append another result's findings.
    pub fn merge(&mut self, other: Self) {
        self.violations.extend(other.violations);
    }
}
