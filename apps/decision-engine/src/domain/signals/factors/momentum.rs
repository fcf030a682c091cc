//! Momentum: blended short/medium/long returns plus volume growth.

use chrono::NaiveDate;

use super::{FactorCalculator, malformed, require, trailing_return};
use crate::config::MomentumConfig;
use crate::domain::signals::errors::DataError;
use crate::domain::signals::value_objects::{FactorKind, FactorReading, InstrumentData};

/// Momentum calculator.
#[derive(Debug, Clone)]
pub struct MomentumCalculator {
    config: MomentumConfig,
}

impl MomentumCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(config: MomentumConfig) -> Self {
        Self { config }
    }
}

impl FactorCalculator for MomentumCalculator {
    fn kind(&self) -> FactorKind {
        FactorKind::Momentum
    }

    fn bars_required(&self) -> usize {
        (self.config.long_window + 1).max(self.config.volume_long_window)
    }

    fn compute(&self, data: &InstrumentData, _as_of: NaiveDate) -> Result<FactorReading, DataError> {
        let c = &self.config;
        require(data, self.kind(), self.bars_required(), data.bars.len())?;

        let closes = data.closes();
        let ret = |window| {
            trailing_return(&closes, window)
                .ok_or_else(|| malformed(data, "non-positive close in return window"))
        };
        let short = ret(c.short_window)?;
        let medium = ret(c.medium_window)?;
        let long = ret(c.long_window)?;

        let volumes: Vec<f64> = data.bars.iter().map(|bar| bar.volume).collect();
        let recent = super::sma(&volumes, volumes.len(), c.volume_short_window);
        let baseline = super::sma(&volumes, volumes.len(), c.volume_long_window);
        let volume_growth = match (recent, baseline) {
            (Some(recent), Some(baseline)) if baseline > 0.0 => recent / baseline - 1.0,
            _ => 0.0,
        };

        let combined = c.short_weight * short
            + c.medium_weight * medium
            + c.long_weight * long
            + c.volume_weight * volume_growth;

        Ok(FactorReading::new((c.scale * combined).tanh())
            .with_detail("return_short", short)
            .with_detail("return_medium", medium)
            .with_detail("return_long", long)
            .with_detail("volume_growth", volume_growth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signals::factors::test_support::{as_of, data_with_closes, trending};

    fn calculator() -> MomentumCalculator {
        MomentumCalculator::new(MomentumConfig::default())
    }

    #[test]
    fn uptrend_scores_positive() {
        let data = data_with_closes(&trending(130, 0.002));
        let reading = calculator().compute(&data, as_of()).unwrap();
        assert!(reading.raw > 0.0);
        assert!(reading.raw < 1.0);
        assert!(reading.details["return_long"] > reading.details["return_short"]);
    }

    #[test]
    fn downtrend_scores_negative() {
        let data = data_with_closes(&trending(130, -0.002));
        let reading = calculator().compute(&data, as_of()).unwrap();
        assert!(reading.raw < 0.0);
    }

    #[test]
    fn short_history_is_insufficient() {
        let data = data_with_closes(&trending(60, 0.01));
        let result = calculator().compute(&data, as_of());
        assert!(matches!(
            result,
            Err(DataError::Insufficient { required: 121, available: 60, .. })
        ));
    }

    #[test]
    fn zero_price_is_malformed() {
        let mut closes = trending(130, 0.001);
        closes[130 - 21] = 0.0;
        let data = data_with_closes(&closes);
        let result = calculator().compute(&data, as_of());
        assert!(matches!(result, Err(DataError::Malformed { .. })));
    }
}
