//! Factor identity and scores.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The six factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// Blended returns and volume growth.
    Momentum,
    /// Moving averages, high proximity, RSI.
    Technical,
    /// PER and PBR.
    Value,
    /// ROE and debt ratio.
    Quality,
    /// Foreign and institutional net buying.
    Flow,
    /// Decayed corporate events.
    Event,
}

impl FactorKind {
    /// All factors in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Momentum,
        Self::Technical,
        Self::Value,
        Self::Quality,
        Self::Flow,
        Self::Event,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Momentum => "momentum",
            Self::Technical => "technical",
            Self::Value => "value",
            Self::Quality => "quality",
            Self::Flow => "flow",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one calculator for one instrument, before normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactorReading {
    /// Raw score, already within -1..1.
    pub raw: f64,
    /// Inputs used, for the details payload.
    pub details: BTreeMap<String, f64>,
}

impl FactorReading {
    /// Create a reading with no details.
    #[must_use]
    pub const fn new(raw: f64) -> Self {
        Self {
            raw,
            details: BTreeMap::new(),
        }
    }

    /// Attach a named input.
    #[must_use]
    pub fn with_detail(mut self, name: &str, value: f64) -> Self {
        self.details.insert(name.to_string(), value);
        self
    }
}

/// Six scores, each within -1..1. Zero is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorScores {
    /// Momentum score.
    pub momentum: f64,
    /// Technical score.
    pub technical: f64,
    /// Value score.
    pub value: f64,
    /// Quality score.
    pub quality: f64,
    /// Flow score.
    pub flow: f64,
    /// Event score.
    pub event: f64,
}

impl FactorScores {
    /// Score of one factor.
    #[must_use]
    pub const fn get(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::Momentum => self.momentum,
            FactorKind::Technical => self.technical,
            FactorKind::Value => self.value,
            FactorKind::Quality => self.quality,
            FactorKind::Flow => self.flow,
            FactorKind::Event => self.event,
        }
    }

    /// Set the score of one factor, clamped to -1..1.
    pub fn set(&mut self, kind: FactorKind, score: f64) {
        let score = if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        match kind {
            FactorKind::Momentum => self.momentum = score,
            FactorKind::Technical => self.technical = score,
            FactorKind::Value => self.value = score,
            FactorKind::Quality => self.quality = score,
            FactorKind::Flow => self.flow = score,
            FactorKind::Event => self.event = score,
        }
    }

    /// Same score on every factor.
    #[must_use]
    pub fn uniform(score: f64) -> Self {
        let mut scores = Self::default();
        for kind in FactorKind::ALL {
            scores.set(kind, score);
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_and_rejects_non_finite() {
        let mut scores = FactorScores::default();
        scores.set(FactorKind::Flow, 3.0);
        scores.set(FactorKind::Value, f64::NAN);
        assert_eq!(scores.get(FactorKind::Flow), 1.0);
        assert_eq!(scores.get(FactorKind::Value), 0.0);
    }

    #[test]
    fn factor_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FactorKind::Momentum).unwrap();
        assert_eq!(json, "\"momentum\"");
        assert_eq!(FactorKind::Event.to_string(), "event");
    }
}
