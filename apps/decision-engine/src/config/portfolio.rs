//! Portfolio construction configuration.

use serde::{Deserialize, Serialize};

/// Tolerance on Σ weights + cash = 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.005;

/// Portfolio construction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Number of positions the tier scheme is built for.
    #[serde(default = "default_target_holdings")]
    pub target_holdings: usize,
    /// Contiguous rank bands with a fixed per-position weight.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
    /// Cash weight targeted by the tier scheme.
    #[serde(default = "default_cash_weight")]
    pub cash_weight: f64,
    /// Minimum weight of a held position.
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    /// Maximum weight of a held position.
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    /// Aggregate weight ceiling per sector.
    #[serde(default = "default_sector_max")]
    pub sector_max: f64,
    /// Maximum rebalance order value as a share of ADTV20.
    #[serde(default = "default_max_adtv_participation")]
    pub max_adtv_participation: f64,
    /// Weight changes smaller than this become HOLD.
    #[serde(default = "default_rebalance_band")]
    pub rebalance_band: f64,
    /// Fail when fewer candidates than `target_holdings` are ranked.
    #[serde(default)]
    pub strict_candidate_count: bool,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            target_holdings: default_target_holdings(),
            tiers: default_tiers(),
            cash_weight: default_cash_weight(),
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            sector_max: default_sector_max(),
            max_adtv_participation: default_max_adtv_participation(),
            rebalance_band: default_rebalance_band(),
            strict_candidate_count: false,
        }
    }
}

/// One rank band of the tier scheme (ranks are inclusive, 1-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// First rank of the band.
    pub start_rank: usize,
    /// Last rank of the band.
    pub end_rank: usize,
    /// Weight of each position in the band.
    pub weight: f64,
}

impl TierConfig {
    /// Number of positions in the band.
    #[must_use]
    pub const fn slots(&self) -> usize {
        (self.end_rank + 1).saturating_sub(self.start_rank)
    }

    /// Whether `rank` falls in the band.
    #[must_use]
    pub const fn contains(&self, rank: usize) -> bool {
        rank >= self.start_rank && rank <= self.end_rank
    }
}

const fn default_target_holdings() -> usize {
    20
}

fn default_tiers() -> Vec<TierConfig> {
    vec![
        TierConfig {
            start_rank: 1,
            end_rank: 5,
            weight: 0.07,
        },
        TierConfig {
            start_rank: 6,
            end_rank: 15,
            weight: 0.04,
        },
        TierConfig {
            start_rank: 16,
            end_rank: 20,
            weight: 0.02,
        },
    ]
}

const fn default_cash_weight() -> f64 {
    0.15
}

const fn default_min_weight() -> f64 {
    0.02
}

const fn default_max_weight() -> f64 {
    0.10
}

const fn default_sector_max() -> f64 {
    0.30
}

const fn default_max_adtv_participation() -> f64 {
    0.10
}

const fn default_rebalance_band() -> f64 {
    0.005
}
