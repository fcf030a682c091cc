//! Execution planning configuration: pricing, splitting, slippage.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::OrderType;

/// Execution planning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Order type used for every planned order.
    #[serde(default = "default_order_type")]
    pub order_type: OrderType,
    /// Limit price offset from the current price, in basis points.
    #[serde(default = "default_limit_offset_bps")]
    pub limit_offset_bps: Decimal,
    /// Price-dependent tick sizes, ascending by `below`.
    #[serde(default = "default_tick_table")]
    pub tick_table: Vec<TickBand>,
    /// Order splitting.
    #[serde(default)]
    pub splitting: SplittingConfig,
    /// Slippage assumptions by liquidity tier.
    #[serde(default = "default_slippage_segments")]
    pub slippage_segments: Vec<SlippageSegment>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_type: default_order_type(),
            limit_offset_bps: default_limit_offset_bps(),
            tick_table: default_tick_table(),
            splitting: SplittingConfig::default(),
            slippage_segments: default_slippage_segments(),
        }
    }
}

const fn default_order_type() -> OrderType {
    OrderType::Limit
}

fn default_limit_offset_bps() -> Decimal {
    dec!(10)
}

/// Tick size applying to prices strictly below `below` (`None` = no upper bound).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickBand {
    /// Exclusive upper price bound.
    #[serde(default)]
    pub below: Option<Decimal>,
    /// Tick size.
    pub tick: Decimal,
}

fn default_tick_table() -> Vec<TickBand> {
    [
        (Some(dec!(2000)), dec!(1)),
        (Some(dec!(5000)), dec!(5)),
        (Some(dec!(20000)), dec!(10)),
        (Some(dec!(50000)), dec!(50)),
        (Some(dec!(200000)), dec!(100)),
        (Some(dec!(500000)), dec!(500)),
        (None, dec!(1000)),
    ]
    .into_iter()
    .map(|(below, tick)| TickBand { below, tick })
    .collect()
}

/// Order splitting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplittingConfig {
    /// Split orders at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Notional / ADTV20 above which an order is split.
    #[serde(default = "default_trigger_ratio")]
    pub trigger_ratio: f64,
    /// Minimum number of slices.
    #[serde(default = "default_min_slices")]
    pub min_slices: u32,
    /// Maximum number of slices.
    #[serde(default = "default_max_slices")]
    pub max_slices: u32,
    /// Seconds between consecutive slices.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SplittingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_ratio: default_trigger_ratio(),
            min_slices: default_min_slices(),
            max_slices: default_max_slices(),
            interval_secs: default_interval_secs(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_trigger_ratio() -> f64 {
    0.02
}

const fn default_min_slices() -> u32 {
    2
}

const fn default_max_slices() -> u32 {
    10
}

const fn default_interval_secs() -> u64 {
    300
}

/// Liquidity tier: instruments with ADTV20 ≥ `min_adtv` assume `slippage_pct`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippageSegment {
    /// Inclusive lower ADTV20 bound.
    pub min_adtv: Decimal,
    /// Assumed slippage as a fraction of price.
    pub slippage_pct: f64,
}

fn default_slippage_segments() -> Vec<SlippageSegment> {
    vec![
        SlippageSegment {
            min_adtv: dec!(100000000000),
            slippage_pct: 0.001,
        },
        SlippageSegment {
            min_adtv: dec!(10000000000),
            slippage_pct: 0.002,
        },
        SlippageSegment {
            min_adtv: dec!(1000000000),
            slippage_pct: 0.004,
        },
        SlippageSegment {
            min_adtv: Decimal::ZERO,
            slippage_pct: 0.008,
        },
    ]
}
