//! Weighted ranking.

use serde::Serialize;
use tracing::warn;

use crate::config::FactorWeights;
use crate::domain::shared::InstrumentCode;
use crate::domain::signals::{FactorKind, SignalSet};

/// Per-factor contribution to a total score (score × weight / 100).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FactorBreakdown {
    /// Momentum contribution.
    pub momentum: f64,
    /// Technical contribution.
    pub technical: f64,
    /// Value contribution.
    pub value: f64,
    /// Quality contribution.
    pub quality: f64,
    /// Flow contribution.
    pub flow: f64,
    /// Event contribution.
    pub event: f64,
}

impl FactorBreakdown {
    fn set(&mut self, kind: FactorKind, contribution: f64) {
        match kind {
            FactorKind::Momentum => self.momentum = contribution,
            FactorKind::Technical => self.technical = contribution,
            FactorKind::Value => self.value = contribution,
            FactorKind::Quality => self.quality = contribution,
            FactorKind::Flow => self.flow = contribution,
            FactorKind::Event => self.event = contribution,
        }
    }

    /// Sum of contributions.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.momentum + self.technical + self.value + self.quality + self.flow + self.event
    }
}

/// A screened instrument with its rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStock {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Display name.
    pub name: String,
    /// 1-based rank.
    pub rank: usize,
    /// Weighted total score.
    pub total_score: f64,
    /// Per-factor contributions.
    pub breakdown: FactorBreakdown,
}

/// Ranks candidates by the weighted sum of their six scores.
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: FactorWeights,
}

impl Ranker {
    /// Create a ranker. Weights are validated to sum to 100 at config load.
    #[must_use]
    pub const fn new(weights: FactorWeights) -> Self {
        Self { weights }
    }

    fn weight(&self, kind: FactorKind) -> u32 {
        match kind {
            FactorKind::Momentum => self.weights.momentum,
            FactorKind::Technical => self.weights.technical,
            FactorKind::Value => self.weights.value,
            FactorKind::Quality => self.weights.quality,
            FactorKind::Flow => self.weights.flow,
            FactorKind::Event => self.weights.event,
        }
    }

    /// Rank `codes` using their signals.
    ///
    /// Sorted by total score descending, ties broken by code ascending.
    /// Ranks are exactly 1..N. Codes missing from the signal set are skipped.
    #[must_use]
    pub fn rank(&self, codes: &[InstrumentCode], signal_set: &SignalSet) -> Vec<RankedStock> {
        let mut ranked: Vec<RankedStock> = codes
            .iter()
            .filter_map(|code| {
                let Some(signals) = signal_set.get(code) else {
                    warn!(code = %code, "Candidate missing from signal set, skipped");
                    return None;
                };
                let mut breakdown = FactorBreakdown::default();
                for kind in FactorKind::ALL {
                    let contribution =
                        signals.scores.get(kind) * f64::from(self.weight(kind)) / 100.0;
                    breakdown.set(kind, contribution);
                }
                Some(RankedStock {
                    code: code.clone(),
                    name: signals.name.clone(),
                    rank: 0,
                    total_score: breakdown.total(),
                    breakdown,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.total_score
                .total_cmp(&a.total_score)
                .then_with(|| a.code.cmp(&b.code))
        });
        ranked.dedup_by(|a, b| a.code == b.code);
        for (i, stock) in ranked.iter_mut().enumerate() {
            stock.rank = i + 1;
        }
        ranked
    }
}
