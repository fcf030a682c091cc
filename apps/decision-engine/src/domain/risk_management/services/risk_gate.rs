//! Pre-trade risk gate.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::RiskGateConfig;
use crate::domain::portfolio::TargetPortfolio;
use crate::domain::risk_management::value_objects::{
    ConstraintResult, ConstraintViolation, RiskGateEvent, RiskGateMode, RiskModel, ViolationCode,
};
use crate::domain::shared::{InstrumentCode, RunId};
use crate::observability::record_risk_gate_check;

/// Metric key for a VaR confidence level, e.g. `var_95`.
#[must_use]
pub fn var_metric_key(confidence: f64) -> String {
    format!("var_{}", (confidence * 100.0).round() as u32)
}

/// Parametric VaR and concentration check over a target portfolio.
#[derive(Debug, Clone)]
pub struct RiskGate {
    config: RiskGateConfig,
}

impl RiskGate {
    /// Create a risk gate.
    #[must_use]
    pub const fn new(config: RiskGateConfig) -> Self {
        Self { config }
    }

    /// Configured mode.
    #[must_use]
    pub const fn mode(&self) -> RiskGateMode {
        self.config.mode
    }

    /// Check a portfolio.
    ///
    /// Always returns an event. In OFF mode nothing is computed; in SHADOW
    /// mode `passed` is always true and `would_block` records the verdict;
    /// in ENFORCE mode `passed` is false when any blocking violation exists.
    #[must_use]
    pub fn check(
        &self,
        portfolio: &TargetPortfolio,
        model: &RiskModel,
        run_id: &RunId,
    ) -> RiskGateEvent {
        let mode = self.config.mode;
        if mode == RiskGateMode::Off {
            info!(run_id = %run_id, "Risk gate disabled, check skipped");
            return RiskGateEvent {
                run_id: run_id.clone(),
                mode,
                passed: true,
                would_block: false,
                violation_count: 0,
                metrics: BTreeMap::new(),
                violations: Vec::new(),
                message: "risk gate disabled".to_string(),
            };
        }

        let weights: Vec<(InstrumentCode, f64)> = portfolio
            .held()
            .map(|p| (p.code.clone(), p.weight))
            .collect();

        let mut metrics = BTreeMap::new();
        let mut result = ConstraintResult::success();

        result.merge(self.check_value_at_risk(&weights, model, &mut metrics));
        result.merge(self.check_concentration(&weights, &mut metrics));

        for (code, _) in &weights {
            if !model.has_volatility(code) {
                result.add_violation(
                    ConstraintViolation::new(
                        ViolationCode::DefaultVolatilityUsed,
                        "no price history, default volatility assumed",
                    )
                    .for_instrument(code)
                    .measured(model.volatility(code), None),
                );
            }
        }

        let gross: f64 = weights.iter().map(|(_, w)| w.abs()).sum();
        metrics.insert("gross_exposure".to_string(), gross);
        metrics.insert(
            "portfolio_volatility".to_string(),
            model.portfolio_volatility(&weights),
        );

        let blocking = result.blocking_count();
        let would_block = blocking > 0;
        let passed = match mode {
            RiskGateMode::Enforce => !would_block,
            RiskGateMode::Shadow | RiskGateMode::Off => true,
        };

        let message = if would_block {
            let codes: Vec<&str> = result.blocking_codes().map(ViolationCode::as_str).collect();
            format!("{blocking} limit(s) breached: {}", codes.join(", "))
        } else {
            "all limits satisfied".to_string()
        };

        record_risk_gate_check(&mode.to_string(), would_block);

        if would_block {
            warn!(run_id = %run_id, mode = %mode, passed, %message, "Risk gate breach");
        } else {
            info!(run_id = %run_id, mode = %mode, "Risk gate passed");
        }

        RiskGateEvent {
            run_id: run_id.clone(),
            mode,
            passed,
            would_block,
            violation_count: blocking,
            metrics,
            violations: result.violations,
            message,
        }
    }

    fn check_value_at_risk(
        &self,
        weights: &[(InstrumentCode, f64)],
        model: &RiskModel,
        metrics: &mut BTreeMap<String, f64>,
    ) -> ConstraintResult {
        let mut result = ConstraintResult::success();
        for limit in &self.config.var_limits {
            let key = var_metric_key(limit.confidence);
            let var = model.value_at_risk(weights, limit.confidence);
            metrics.insert(key.clone(), var);
            if var > limit.max_loss_pct {
                result.add_violation(
                    ConstraintViolation::new(
                        ViolationCode::VarLimitExceeded,
                        format!("{key} exceeds limit"),
                    )
                    .measured(var, Some(limit.max_loss_pct)),
                );
            }
        }
        result
    }

    fn check_concentration(
        &self,
        weights: &[(InstrumentCode, f64)],
        metrics: &mut BTreeMap<String, f64>,
    ) -> ConstraintResult {
        let limit = self.config.max_position_weight;
        let max_weight = weights.iter().map(|(_, w)| *w).fold(0.0, f64::max);
        metrics.insert("max_position_weight".to_string(), max_weight);

        let violations = weights
            .iter()
            .filter(|(_, w)| *w > limit + 1e-12)
            .map(|(code, w)| {
                ConstraintViolation::new(
                    ViolationCode::PositionConcentrationExceeded,
                    "position weight above maximum",
                )
                .for_instrument(code)
                .measured(*w, Some(limit))
            })
            .collect();
        ConstraintResult::from_violations(violations)
    }
}
