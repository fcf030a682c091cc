//! Quality: profitability (ROE) and leverage (debt ratio).

use chrono::NaiveDate;

use super::FactorCalculator;
use crate::config::QualityConfig;
use crate::domain::signals::errors::DataError;
use crate::domain::signals::value_objects::{FactorKind, FactorReading, InstrumentData};

/// Quality calculator.
#[derive(Debug, Clone)]
pub struct QualityCalculator {
    config: QualityConfig,
}

impl QualityCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(config: QualityConfig) -> Self {
        Self { config }
    }
}

impl FactorCalculator for QualityCalculator {
    fn kind(&self) -> FactorKind {
        FactorKind::Quality
    }

    fn compute(&self, data: &InstrumentData, _as_of: NaiveDate) -> Result<FactorReading, DataError> {
        let c = &self.config;
        let fundamentals = data.fundamentals.as_ref();
        let roe = fundamentals.and_then(|f| f.roe).filter(|v| v.is_finite());
        let debt = fundamentals.and_then(|f| f.debt_ratio).filter(|v| v.is_finite());

        let roe_term = roe.map(|v| ((v - c.neutral_roe) / c.roe_range).clamp(-1.0, 1.0));
        let debt_term =
            debt.map(|v| ((c.neutral_debt_ratio - v) / c.debt_range).clamp(-1.0, 1.0));

        let raw = match (roe_term, debt_term) {
            (Some(r), Some(d)) => {
                (c.roe_weight * r + c.debt_weight * d) / (c.roe_weight + c.debt_weight)
            }
            (Some(r), None) => r,
            (None, Some(d)) => d,
            (None, None) => {
                return Err(DataError::Missing {
                    code: data.code.to_string(),
                    factor: self.kind(),
                    input: "roe/debt_ratio".to_string(),
                });
            }
        };

        let mut reading = FactorReading::new(raw.clamp(-1.0, 1.0));
        if let Some(roe) = roe {
            reading = reading.with_detail("roe", roe);
        }
        if let Some(debt) = debt {
            reading = reading.with_detail("debt_ratio", debt);
        }
        Ok(reading)
    }
}
