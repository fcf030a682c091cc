//! Technical: moving-average cross and slope, proximity to the recent high,
//! and Wilder RSI.

use chrono::NaiveDate;

use super::{FactorCalculator, malformed, require, sma};
use crate::config::TechnicalConfig;
use crate::domain::signals::errors::DataError;
use crate::domain::signals::value_objects::{FactorKind, FactorReading, InstrumentData};

/// Technical calculator.
#[derive(Debug, Clone)]
pub struct TechnicalCalculator {
    config: TechnicalConfig,
}

impl TechnicalCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }
}

impl FactorCalculator for TechnicalCalculator {
    fn kind(&self) -> FactorKind {
        FactorKind::Technical
    }

    fn bars_required(&self) -> usize {
        let c = &self.config;
        (c.ma_long + c.slope_lookback)
            .max(c.rsi_period + 1)
            .max(c.high_window)
    }

    fn compute(&self, data: &InstrumentData, _as_of: NaiveDate) -> Result<FactorReading, DataError> {
        let c = &self.config;
        let minimum = (c.ma_long + c.slope_lookback).max(c.rsi_period + 1);
        require(data, self.kind(), minimum, data.bars.len())?;

        let closes = data.closes();
        if closes.iter().any(|close| !close.is_finite() || *close <= 0.0) {
            return Err(malformed(data, "non-positive close"));
        }
        let n = closes.len();

        let (Some(short_ma), Some(long_ma), Some(long_ma_before)) = (
            sma(&closes, n, c.ma_short),
            sma(&closes, n, c.ma_long),
            sma(&closes, n - c.slope_lookback, c.ma_long),
        ) else {
            return Err(malformed(data, "moving average window out of range"));
        };

        let cross = ((short_ma / long_ma - 1.0) * 20.0).tanh();
        let slope = ((long_ma / long_ma_before - 1.0) * 50.0).tanh();

        let window = c.high_window.min(n).max(1);
        let high = data.bars[n - window..]
            .iter()
            .map(|bar| bar.high.max(bar.close))
            .fold(f64::MIN, f64::max);
        let close = closes[n - 1];
        let band = c.high_band.max(f64::EPSILON);
        let proximity = 2.0 * ((close / high - (1.0 - band)) / band).clamp(0.0, 1.0) - 1.0;

        let rsi = wilder_rsi(&closes, c.rsi_period)
            .ok_or_else(|| malformed(data, "rsi window out of range"))?;
        let rsi_score = (rsi - 50.0) / 50.0;

        let raw = c.cross_weight * cross
            + c.slope_weight * slope
            + c.high_weight * proximity
            + c.rsi_weight * rsi_score;

        Ok(FactorReading::new(raw.clamp(-1.0, 1.0))
            .with_detail("ma_short", short_ma)
            .with_detail("ma_long", long_ma)
            .with_detail("high", high)
            .with_detail("high_proximity", proximity)
            .with_detail("rsi", rsi))
    }
}

/// Relative strength index with Wilder smoothing.
///
/// Seeds average gain and loss with the simple mean of the first `period`
/// changes, then smooths with `alpha = 1 / period`.
fn wilder_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let p = period as f64;

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / p;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / p;

    for change in &changes[period..] {
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
    }

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    if avg_gain == 0.0 {
        return Some(0.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signals::factors::test_support::{as_of, data_with_closes, trending};

    fn calculator() -> TechnicalCalculator {
        TechnicalCalculator::new(TechnicalConfig::default())
    }

    #[test]
    fn rsi_of_monotonic_series() {
        let up: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(wilder_rsi(&up, 14), Some(100.0));
        let down: Vec<f64> = up.iter().rev().copied().collect();
        assert_eq!(wilder_rsi(&down, 14), Some(0.0));
        let flat = vec![10.0; 20];
        assert_eq!(wilder_rsi(&flat, 14), Some(50.0));
    }

    #[test]
    fn rsi_alternating_is_balanced() {
        let closes: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let rsi = wilder_rsi(&closes, 14).unwrap();
        assert!((rsi - 50.0).abs() < 5.0);
    }

    #[test]
    fn rsi_needs_period_plus_one() {
        assert_eq!(wilder_rsi(&[1.0; 14], 14), None);
    }

    #[test]
    fn uptrend_at_high_scores_positive() {
        let data = data_with_closes(&trending(130, 0.005));
        let reading = calculator().compute(&data, as_of()).unwrap();
        assert!(reading.raw > 0.5);
        assert!((reading.details["high_proximity"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn downtrend_scores_negative() {
        let data = data_with_closes(&trending(130, -0.005));
        let reading = calculator().compute(&data, as_of()).unwrap();
        assert!(reading.raw < -0.5);
    }

    #[test]
    fn short_history_uses_available_high_window() {
        let data = data_with_closes(&trending(40, 0.005));
        let reading = calculator().compute(&data, as_of()).unwrap();
        assert!(reading.raw > 0.0);
    }

    #[test]
    fn too_short_for_moving_averages() {
        let data = data_with_closes(&trending(10, 0.005));
        assert!(matches!(
            calculator().compute(&data, as_of()),
            Err(DataError::Insufficient { .. })
        ));
    }
}
