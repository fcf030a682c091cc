//! Constant-correlation parametric risk model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RiskGateConfig;
use crate::domain::shared::InstrumentCode;

/// Daily volatilities per instrument plus one pairwise correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    volatilities: BTreeMap<InstrumentCode, f64>,
    default_volatility: f64,
    correlation: f64,
    horizon_days: u32,
}

impl RiskModel {
    /// Create a model without any instrument volatilities.
    #[must_use]
    pub const fn new(default_volatility: f64, correlation: f64, horizon_days: u32) -> Self {
        Self {
            volatilities: BTreeMap::new(),
            default_volatility,
            correlation,
            horizon_days,
        }
    }

    /// Set the daily volatility of one instrument.
    #[must_use]
    pub fn with_volatility(mut self, code: InstrumentCode, volatility: f64) -> Self {
        self.volatilities.insert(code, volatility);
        self
    }

    /// Estimate volatilities from daily closes (oldest first).
    ///
    /// Uses the sample standard deviation of the last `lookback_days` log
    /// returns. Instruments with fewer than two usable returns fall back to
    /// the default volatility.
    #[must_use]
    pub fn from_history(
        closes: &BTreeMap<InstrumentCode, Vec<f64>>,
        config: &RiskGateConfig,
    ) -> Self {
        let mut model = Self::new(
            config.default_volatility,
            config.correlation,
            config.horizon_days,
        );

        for (code, series) in closes {
            let start = series.len().saturating_sub(config.lookback_days + 1);
            let returns: Vec<f64> = series[start..]
                .windows(2)
                .filter(|pair| pair[0] > 0.0 && pair[1] > 0.0)
                .map(|pair| (pair[1] / pair[0]).ln())
                .collect();

            if let Some(volatility) = sample_std(&returns) {
                model.volatilities.insert(code.clone(), volatility);
            }
        }

        model
    }

    /// Daily volatility of an instrument, or the default.
    #[must_use]
    pub fn volatility(&self, code: &InstrumentCode) -> f64 {
        self.volatilities
            .get(code)
            .copied()
            .unwrap_or(self.default_volatility)
    }

    /// Whether an instrument has an estimated volatility.
    #[must_use]
    pub fn has_volatility(&self, code: &InstrumentCode) -> bool {
        self.volatilities.contains_key(code)
    }

    /// Daily standard deviation of portfolio return for the given weights.
    ///
    /// With constant correlation ρ:
    /// σ² = (1 − ρ) Σ (wᵢσᵢ)² + ρ (Σ wᵢσᵢ)²
    #[must_use]
    pub fn portfolio_volatility(&self, weights: &[(InstrumentCode, f64)]) -> f64 {
        let scaled: Vec<f64> = weights
            .iter()
            .map(|(code, weight)| weight * self.volatility(code))
            .collect();
        let sum_sq: f64 = scaled.iter().map(|x| x * x).sum();
        let sum: f64 = scaled.iter().sum();
        let variance = (1.0 - self.correlation).mul_add(sum_sq, self.correlation * sum * sum);
        variance.max(0.0).sqrt()
    }

    /// Parametric VaR as a fraction of capital over the model horizon.
    #[must_use]
    pub fn value_at_risk(&self, weights: &[(InstrumentCode, f64)], confidence: f64) -> f64 {
        let z = inverse_normal_cdf(confidence);
        z * self.portfolio_volatility(weights) * f64::from(self.horizon_days).sqrt()
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
///
/// Relative error is below 1.2e-9 over (0, 1). Returns ±∞ at the bounds.
#[must_use]
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
