//! Risk gate mode and audit event.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConstraintViolation;
use crate::domain::shared::RunId;

/// Operating mode of the risk gate.
///
/// The mode is only ever taken from configuration; promoting SHADOW to
/// ENFORCE is a manual configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskGateMode {
    /// Check skipped; the event is still recorded.
    Off,
    /// Check runs and records `would_block`, never blocks.
    Shadow,
    /// A failing check halts the pipeline before orders are generated.
    Enforce,
}

impl fmt::Display for RiskGateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "OFF"),
            Self::Shadow => write!(f, "SHADOW"),
            Self::Enforce => write!(f, "ENFORCE"),
        }
    }
}

/// Append-only record of one risk gate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskGateEvent {
    /// Decision cycle the check belongs to.
    pub run_id: RunId,
    /// Mode the check ran in.
    pub mode: RiskGateMode,
    /// Whether the pipeline may proceed.
    pub passed: bool,
    /// Whether the check found blocking violations, regardless of mode.
    pub would_block: bool,
    /// Number of blocking violations.
    pub violation_count: usize,
    /// Computed risk metrics (e.g. `var_95`, `var_99`) as fractions of capital.
    pub metrics: BTreeMap<String, f64>,
    /// All violations, including warnings.
    pub violations: Vec<ConstraintViolation>,
    /// Summary message.
    pub message: String,
}

impl RiskGateEvent {
    /// Whether this event halts order generation.
    #[must_use]
    pub const fn blocks(&self) -> bool {
        !self.passed
    }
}
