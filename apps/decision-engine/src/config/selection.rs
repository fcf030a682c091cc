//! Screening thresholds and ranking weights.

use serde::{Deserialize, Serialize};

/// Hard cuts applied before ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// Minimum momentum score.
    #[serde(default)]
    pub min_momentum: f64,
    /// Minimum technical score, excludes deeply oversold names.
    #[serde(default = "default_min_technical")]
    pub min_technical: f64,
    /// Minimum flow score, excludes heavy net selling.
    #[serde(default = "default_min_flow")]
    pub min_flow: f64,
    /// Optional PER ceiling.
    #[serde(default)]
    pub max_per: Option<f64>,
    /// Require positive trailing earnings.
    #[serde(default)]
    pub require_positive_earnings: bool,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            min_momentum: 0.0,
            min_technical: default_min_technical(),
            min_flow: default_min_flow(),
            max_per: None,
            require_positive_earnings: false,
        }
    }
}

const fn default_min_technical() -> f64 {
    -0.5
}

const fn default_min_flow() -> f64 {
    -0.3
}

/// Ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Integer factor weights; must sum to exactly 100.
    #[serde(default)]
    pub weights: FactorWeights,
    /// Ceiling on momentum + technical weight.
    #[serde(default = "default_max_correlated_weight")]
    pub max_correlated_weight: u32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            max_correlated_weight: default_max_correlated_weight(),
        }
    }
}

const fn default_max_correlated_weight() -> u32 {
    50
}

/// Integer weights per factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorWeights {
    /// Momentum weight.
    #[serde(default)]
    pub momentum: u32,
    /// Technical weight.
    #[serde(default)]
    pub technical: u32,
    /// Value weight.
    #[serde(default)]
    pub value: u32,
    /// Quality weight.
    #[serde(default)]
    pub quality: u32,
    /// Flow weight.
    #[serde(default)]
    pub flow: u32,
    /// Event weight.
    #[serde(default)]
    pub event: u32,
}

impl FactorWeights {
    /// Sum of all weights.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.momentum + self.technical + self.value + self.quality + self.flow + self.event
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            momentum: 25,
            technical: 15,
            value: 15,
            quality: 10,
            flow: 20,
            event: 15,
        }
    }
}
