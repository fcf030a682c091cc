//! Risk gate configuration.

use serde::{Deserialize, Serialize};

use crate::domain::risk_management::RiskGateMode;

/// Pre-trade risk gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskGateConfig {
    /// OFF, SHADOW or ENFORCE. Changed only by editing configuration.
    #[serde(default = "default_mode")]
    pub mode: RiskGateMode,
    /// VaR limits as a fraction of total capital, per confidence level.
    #[serde(default = "default_var_limits")]
    pub var_limits: Vec<VarLimit>,
    /// Maximum weight of any single position.
    #[serde(default = "default_max_position_weight")]
    pub max_position_weight: f64,
    /// Days of price history used to estimate volatility.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,
    /// Daily volatility assumed when history is missing.
    #[serde(default = "default_volatility")]
    pub default_volatility: f64,
    /// Pairwise correlation of the constant-correlation model.
    #[serde(default = "default_correlation")]
    pub correlation: f64,
    /// VaR horizon in trading days.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Deadline for the check.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RiskGateConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            var_limits: default_var_limits(),
            max_position_weight: default_max_position_weight(),
            lookback_days: default_lookback_days(),
            default_volatility: default_volatility(),
            correlation: default_correlation(),
            horizon_days: default_horizon_days(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Maximum VaR at one confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarLimit {
    /// Confidence level in (0, 1).
    pub confidence: f64,
    /// Maximum loss as a fraction of capital.
    pub max_loss_pct: f64,
}

const fn default_mode() -> RiskGateMode {
    RiskGateMode::Shadow
}

fn default_var_limits() -> Vec<VarLimit> {
    vec![
        VarLimit {
            confidence: 0.95,
            max_loss_pct: 0.03,
        },
        VarLimit {
            confidence: 0.99,
            max_loss_pct: 0.05,
        },
    ]
}

const fn default_max_position_weight() -> f64 {
    0.10
}

const fn default_lookback_days() -> usize {
    60
}

const fn default_volatility() -> f64 {
    0.03
}

const fn default_correlation() -> f64 {
    0.3
}

const fn default_horizon_days() -> u32 {
    1
}

const fn default_timeout_ms() -> u64 {
    2_000
}
