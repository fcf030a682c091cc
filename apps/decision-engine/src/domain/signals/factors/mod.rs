//! Factor calculators.
//!
//! Each calculator reads one instrument's raw data and produces a raw score
//! within -1..1 plus the inputs it used. Calculators are independent; the
//! engine runs all of them for every instrument.

mod event;
mod flow;
mod momentum;
mod quality;
mod technical;
mod value;

use chrono::NaiveDate;

pub use event::EventCalculator;
pub use flow::FlowCalculator;
pub use momentum::MomentumCalculator;
pub use quality::QualityCalculator;
pub use technical::TechnicalCalculator;
pub use value::ValueCalculator;

use super::errors::DataError;
use super::value_objects::{FactorKind, FactorReading, InstrumentData};
use crate::config::SignalsConfig;

/// Computes one factor for one instrument.
pub trait FactorCalculator: Send + Sync {
    /// The factor this calculator produces.
    fn kind(&self) -> FactorKind;

    /// Number of daily bars this calculator needs.
    fn bars_required(&self) -> usize {
        0
    }

    /// Number of investor-flow days this calculator needs.
    fn flows_required(&self) -> usize {
        0
    }

    /// Compute the raw score.
    ///
    /// # Errors
    ///
    /// Returns a `DataError` when inputs are missing, too short or malformed;
    /// the engine substitutes the neutral score.
    fn compute(&self, data: &InstrumentData, as_of: NaiveDate) -> Result<FactorReading, DataError>;
}

/// The six calculators configured from `config`, in canonical factor order.
#[must_use]
pub fn default_calculators(config: &SignalsConfig) -> Vec<Box<dyn FactorCalculator>> {
    vec![
        Box::new(MomentumCalculator::new(config.momentum.clone())),
        Box::new(TechnicalCalculator::new(config.technical.clone())),
        Box::new(ValueCalculator::new(config.value.clone())),
        Box::new(QualityCalculator::new(config.quality.clone())),
        Box::new(FlowCalculator::new(config.flow.clone())),
        Box::new(EventCalculator::new(config.event.clone())),
    ]
}

fn require(
    data: &InstrumentData,
    factor: FactorKind,
    required: usize,
    available: usize,
) -> Result<(), DataError> {
    if available < required {
        return Err(DataError::Insufficient {
            code: data.code.to_string(),
            factor,
            required,
            available,
        });
    }
    Ok(())
}

fn malformed(data: &InstrumentData, message: impl Into<String>) -> DataError {
    DataError::Malformed {
        code: data.code.to_string(),
        message: message.into(),
    }
}

/// Simple moving average of the `window` values ending at `end` (exclusive).
fn sma(values: &[f64], end: usize, window: usize) -> Option<f64> {
    if window == 0 || end > values.len() || end < window {
        return None;
    }
    Some(values[end - window..end].iter().sum::<f64>() / window as f64)
}

/// Return over the last `window` observations.
fn trailing_return(values: &[f64], window: usize) -> Option<f64> {
    let last = *values.last()?;
    let base = *values.get(values.len().checked_sub(window + 1)?)?;
    (base > 0.0).then(|| last / base - 1.0)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate};

    use crate::domain::shared::InstrumentCode;
    use crate::domain::signals::value_objects::{DailyBar, InstrumentData};

    pub fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    /// Bars with the given closes ending on `as_of`, constant volume.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<DailyBar> {
        let n = closes.len() as i64;
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyBar {
                date: as_of() - Duration::days(n - 1 - i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
                traded_value: close * 1_000.0,
            })
            .collect()
    }

    pub fn data_with_closes(closes: &[f64]) -> InstrumentData {
        let mut data = InstrumentData::new(InstrumentCode::new("TEST"));
        data.bars = bars_from_closes(closes);
        data
    }

    /// Geometric series of `n` closes growing by `rate` per bar.
    pub fn trending(n: usize, rate: f64) -> Vec<f64> {
        (0..n).map(|i| 100.0 * (1.0 + rate).powi(i as i32)).collect()
    }
}
