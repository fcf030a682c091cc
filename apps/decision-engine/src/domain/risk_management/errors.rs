//! Risk gate errors.

use thiserror::Error;

use crate::domain::shared::RunId;

/// An ENFORCE-mode risk gate refused the target portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("risk gate blocked run {run_id}: {message}")]
pub struct RiskGateViolation {
    /// Decision cycle.
    pub run_id: RunId,
    /// Number of blocking violations.
    pub violation_count: usize,
    /// Summary message.
    pub message: String,
}
