//! Signal engine configuration: factor calculators and normalization.

use serde::{Deserialize, Serialize};

/// Signal engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalsConfig {
    /// Worker pool size for per-instrument factor computation.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Cross-sectional normalization.
    #[serde(default)]
    pub normalization: NormalizationConfig,
    /// Momentum factor.
    #[serde(default)]
    pub momentum: MomentumConfig,
    /// Technical factor.
    #[serde(default)]
    pub technical: TechnicalConfig,
    /// Value factor.
    #[serde(default)]
    pub value: ValueConfig,
    /// Quality factor.
    #[serde(default)]
    pub quality: QualityConfig,
    /// Investor flow factor.
    #[serde(default)]
    pub flow: FlowConfig,
    /// Event factor.
    #[serde(default)]
    pub event: EventConfig,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            normalization: NormalizationConfig::default(),
            momentum: MomentumConfig::default(),
            technical: TechnicalConfig::default(),
            value: ValueConfig::default(),
            quality: QualityConfig::default(),
            flow: FlowConfig::default(),
            event: EventConfig::default(),
        }
    }
}

const fn default_max_concurrency() -> usize {
    4
}

/// Winsorize, z-score, clip and rescale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// Apply normalization at all; raw factor scores are kept otherwise.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fraction trimmed on each tail before the z-score (0.0..0.5).
    #[serde(default = "default_winsor_pct")]
    pub winsor_pct: f64,
    /// Clip z-scores at this many standard deviations; also the final divisor.
    #[serde(default = "default_clip_sigma")]
    pub clip_sigma: f64,
    /// Minimum number of instruments with data before statistics are used.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            winsor_pct: default_winsor_pct(),
            clip_sigma: default_clip_sigma(),
            min_samples: default_min_samples(),
        }
    }
}

pub(crate) const fn default_true() -> bool {
    true
}

const fn default_winsor_pct() -> f64 {
    0.025
}

const fn default_clip_sigma() -> f64 {
    3.0
}

const fn default_min_samples() -> usize {
    3
}

/// Momentum factor: blended returns plus volume growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Short return window in trading days.
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    /// Medium return window.
    #[serde(default = "default_medium_window")]
    pub medium_window: usize,
    /// Long return window.
    #[serde(default = "default_long_window")]
    pub long_window: usize,
    /// Recent volume window for the volume-growth term.
    #[serde(default = "default_volume_short_window")]
    pub volume_short_window: usize,
    /// Baseline volume window.
    #[serde(default = "default_volume_long_window")]
    pub volume_long_window: usize,
    /// Weight of the short return.
    #[serde(default = "default_momentum_short_weight")]
    pub short_weight: f64,
    /// Weight of the medium return.
    #[serde(default = "default_momentum_medium_weight")]
    pub medium_weight: f64,
    /// Weight of the long return.
    #[serde(default = "default_momentum_long_weight")]
    pub long_weight: f64,
    /// Weight of the volume-growth term.
    #[serde(default = "default_momentum_volume_weight")]
    pub volume_weight: f64,
    /// Multiplier applied before `tanh`.
    #[serde(default = "default_momentum_scale")]
    pub scale: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            medium_window: default_medium_window(),
            long_window: default_long_window(),
            volume_short_window: default_volume_short_window(),
            volume_long_window: default_volume_long_window(),
            short_weight: default_momentum_short_weight(),
            medium_weight: default_momentum_medium_weight(),
            long_weight: default_momentum_long_weight(),
            volume_weight: default_momentum_volume_weight(),
            scale: default_momentum_scale(),
        }
    }
}

const fn default_short_window() -> usize {
    20
}

const fn default_medium_window() -> usize {
    60
}

const fn default_long_window() -> usize {
    120
}

const fn default_volume_short_window() -> usize {
    5
}

const fn default_volume_long_window() -> usize {
    20
}

const fn default_momentum_short_weight() -> f64 {
    0.3
}

const fn default_momentum_medium_weight() -> f64 {
    0.3
}

const fn default_momentum_long_weight() -> f64 {
    0.2
}

const fn default_momentum_volume_weight() -> f64 {
    0.2
}

const fn default_momentum_scale() -> f64 {
    2.0
}

/// Technical factor: MA crossover and slope, high proximity, RSI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalConfig {
    /// Fast moving average length.
    #[serde(default = "default_ma_short")]
    pub ma_short: usize,
    /// Slow moving average length.
    #[serde(default = "default_ma_long")]
    pub ma_long: usize,
    /// Bars between the two slow-MA samples used for the slope.
    #[serde(default = "default_slope_lookback")]
    pub slope_lookback: usize,
    /// Window for the reference high.
    #[serde(default = "default_long_window")]
    pub high_window: usize,
    /// Distance below the high (as a fraction) that maps to score -1.
    #[serde(default = "default_high_band")]
    pub high_band: f64,
    /// RSI period.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// Weight of the crossover term.
    #[serde(default = "default_cross_weight")]
    pub cross_weight: f64,
    /// Weight of the slope term.
    #[serde(default = "default_slope_weight")]
    pub slope_weight: f64,
    /// Weight of the high-proximity term.
    #[serde(default = "default_quarter")]
    pub high_weight: f64,
    /// Weight of the RSI term.
    #[serde(default = "default_quarter")]
    pub rsi_weight: f64,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            ma_short: default_ma_short(),
            ma_long: default_ma_long(),
            slope_lookback: default_slope_lookback(),
            high_window: default_long_window(),
            high_band: default_high_band(),
            rsi_period: default_rsi_period(),
            cross_weight: default_cross_weight(),
            slope_weight: default_slope_weight(),
            high_weight: default_quarter(),
            rsi_weight: default_quarter(),
        }
    }
}

const fn default_ma_short() -> usize {
    5
}

const fn default_ma_long() -> usize {
    20
}

const fn default_slope_lookback() -> usize {
    5
}

const fn default_high_band() -> f64 {
    0.2
}

const fn default_rsi_period() -> usize {
    14
}

const fn default_cross_weight() -> f64 {
    0.3
}

const fn default_slope_weight() -> f64 {
    0.2
}

const fn default_quarter() -> f64 {
    0.25
}

/// Value factor: PER and PBR against neutral levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueConfig {
    /// PER considered fairly valued.
    #[serde(default = "default_neutral_per")]
    pub neutral_per: f64,
    /// PBR considered fairly valued.
    #[serde(default = "default_neutral_pbr")]
    pub neutral_pbr: f64,
    /// Weight of the PER term.
    #[serde(default = "default_per_weight")]
    pub per_weight: f64,
    /// Weight of the PBR term.
    #[serde(default = "default_pbr_weight")]
    pub pbr_weight: f64,
    /// Multiplier applied before `tanh`.
    #[serde(default = "default_value_scale")]
    pub scale: f64,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            neutral_per: default_neutral_per(),
            neutral_pbr: default_neutral_pbr(),
            per_weight: default_per_weight(),
            pbr_weight: default_pbr_weight(),
            scale: default_value_scale(),
        }
    }
}

const fn default_neutral_per() -> f64 {
    15.0
}

const fn default_neutral_pbr() -> f64 {
    1.0
}

const fn default_per_weight() -> f64 {
    0.6
}

const fn default_pbr_weight() -> f64 {
    0.4
}

const fn default_value_scale() -> f64 {
    1.5
}

/// Quality factor: ROE and debt ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// ROE mapping to score 0.
    #[serde(default = "default_neutral_roe")]
    pub neutral_roe: f64,
    /// ROE distance from neutral that maps to ±1.
    #[serde(default = "default_roe_range")]
    pub roe_range: f64,
    /// Debt ratio mapping to score 0.
    #[serde(default = "default_neutral_debt_ratio")]
    pub neutral_debt_ratio: f64,
    /// Debt ratio distance from neutral that maps to ±1.
    #[serde(default = "default_debt_range")]
    pub debt_range: f64,
    /// Weight of the ROE term.
    #[serde(default = "default_roe_weight")]
    pub roe_weight: f64,
    /// Weight of the debt term.
    #[serde(default = "default_debt_weight")]
    pub debt_weight: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            neutral_roe: default_neutral_roe(),
            roe_range: default_roe_range(),
            neutral_debt_ratio: default_neutral_debt_ratio(),
            debt_range: default_debt_range(),
            roe_weight: default_roe_weight(),
            debt_weight: default_debt_weight(),
        }
    }
}

const fn default_neutral_roe() -> f64 {
    0.10
}

const fn default_roe_range() -> f64 {
    0.10
}

const fn default_neutral_debt_ratio() -> f64 {
    1.0
}

const fn default_debt_range() -> f64 {
    1.0
}

const fn default_roe_weight() -> f64 {
    0.6
}

const fn default_debt_weight() -> f64 {
    0.4
}

/// Flow factor: foreign and institutional net buying relative to ADTV20.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Short net-buying window.
    #[serde(default = "default_volume_short_window")]
    pub short_window: usize,
    /// Long net-buying window.
    #[serde(default = "default_volume_long_window")]
    pub long_window: usize,
    /// Window for the average daily traded value.
    #[serde(default = "default_volume_long_window")]
    pub adtv_window: usize,
    /// Weight of foreign investors.
    #[serde(default = "default_per_weight")]
    pub foreign_weight: f64,
    /// Weight of institutional investors.
    #[serde(default = "default_pbr_weight")]
    pub institution_weight: f64,
    /// Weight of the short window.
    #[serde(default = "default_per_weight")]
    pub short_weight: f64,
    /// Weight of the long window.
    #[serde(default = "default_pbr_weight")]
    pub long_weight: f64,
    /// Multiplier applied before `tanh`.
    #[serde(default = "default_flow_scale")]
    pub scale: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            short_window: default_volume_short_window(),
            long_window: default_volume_long_window(),
            adtv_window: default_volume_long_window(),
            foreign_weight: default_per_weight(),
            institution_weight: default_pbr_weight(),
            short_weight: default_per_weight(),
            long_weight: default_pbr_weight(),
            scale: default_flow_scale(),
        }
    }
}

const fn default_flow_scale() -> f64 {
    10.0
}

/// Event factor: exponentially decayed pre-scored events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Days for an event's weight to halve.
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,
    /// Floor on an event's weight.
    #[serde(default = "default_min_event_weight")]
    pub min_weight: f64,
    /// Magnitude of the most extreme event score (N in -N..+N).
    #[serde(default = "default_max_event_score")]
    pub max_abs_score: f64,
    /// Events older than this are ignored.
    #[serde(default = "default_event_lookback_days")]
    pub lookback_days: i64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_half_life_days(),
            min_weight: default_min_event_weight(),
            max_abs_score: default_max_event_score(),
            lookback_days: default_event_lookback_days(),
        }
    }
}

const fn default_half_life_days() -> f64 {
    10.0
}

const fn default_min_event_weight() -> f64 {
    0.05
}

const fn default_max_event_score() -> f64 {
    5.0
}

const fn default_event_lookback_days() -> i64 {
    90
}
