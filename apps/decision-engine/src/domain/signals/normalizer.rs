//! Cross-sectional normalization of raw factor scores.
//!
//! Pipeline: winsorize at a fixed percentile on each tail, z-score against
//! the cross-section, clip at ±k standard deviations, divide by k so the
//! result lies in -1..1.

use std::collections::BTreeMap;

use crate::config::NormalizationConfig;
use crate::domain::shared::InstrumentCode;

/// Normalizes one factor across the instruments that have data for it.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizationConfig,
}

impl Normalizer {
    /// Create a normalizer.
    #[must_use]
    pub const fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }

    /// Normalize raw values.
    ///
    /// Instruments without data must not be passed in; they keep the
    /// neutral score and do not influence the statistics. When disabled or
    /// when too few samples exist, raw values are returned clamped to -1..1.
    #[must_use]
    pub fn normalize(&self, raw: &BTreeMap<InstrumentCode, f64>) -> BTreeMap<InstrumentCode, f64> {
        let finite: BTreeMap<&InstrumentCode, f64> = raw
            .iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(code, v)| (code, *v))
            .collect();

        if !self.config.enabled || finite.len() < self.config.min_samples {
            return finite
                .into_iter()
                .map(|(code, v)| (code.clone(), v.clamp(-1.0, 1.0)))
                .collect();
        }

        let mut sorted: Vec<f64> = finite.values().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let lower = quantile(&sorted, self.config.winsor_pct);
        let upper = quantile(&sorted, 1.0 - self.config.winsor_pct);

        let winsorized: Vec<(&InstrumentCode, f64)> = finite
            .into_iter()
            .map(|(code, v)| (code, v.clamp(lower, upper)))
            .collect();

        let n = winsorized.len() as f64;
        let mean = winsorized.iter().map(|(_, v)| v).sum::<f64>() / n;
        let variance = winsorized
            .iter()
            .map(|(_, v)| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();
        let k = self.config.clip_sigma;

        winsorized
            .into_iter()
            .map(|(code, v)| {
                let score = if std <= f64::EPSILON {
                    0.0
                } else {
                    ((v - mean) / std).clamp(-k, k) / k
                };
                (code.clone(), score)
            })
            .collect()
    }
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    (sorted[hi] - sorted[lo]).mul_add(frac, sorted[lo])
}
