//! Value: cheapness on PER and PBR relative to neutral multiples.

use chrono::NaiveDate;

use super::FactorCalculator;
use crate::config::ValueConfig;
use crate::domain::signals::errors::DataError;
use crate::domain::signals::value_objects::{FactorKind, FactorReading, InstrumentData};

/// Value calculator.
#[derive(Debug, Clone)]
pub struct ValueCalculator {
    config: ValueConfig,
}

impl ValueCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(config: ValueConfig) -> Self {
        Self { config }
    }

    /// Cheapness of one multiple. Loss-making (non-positive) multiples floor at -1.
    fn cheapness(multiple: f64, neutral: f64) -> f64 {
        if multiple <= 0.0 {
            return -1.0;
        }
        ((neutral - multiple) / neutral).clamp(-1.0, 1.0)
    }
}

impl FactorCalculator for ValueCalculator {
    fn kind(&self) -> FactorKind {
        FactorKind::Value
    }

    fn compute(&self, data: &InstrumentData, _as_of: NaiveDate) -> Result<FactorReading, DataError> {
        let c = &self.config;
        let fundamentals = data.fundamentals.as_ref();
        let per = fundamentals.and_then(|f| f.per).filter(|v| v.is_finite());
        let pbr = fundamentals.and_then(|f| f.pbr).filter(|v| v.is_finite());

        let per_term = per.map(|v| Self::cheapness(v, c.neutral_per));
        let pbr_term = pbr.map(|v| Self::cheapness(v, c.neutral_pbr));

        let blended = match (per_term, pbr_term) {
            (Some(p), Some(b)) => {
                let total = c.per_weight + c.pbr_weight;
                (c.per_weight * p + c.pbr_weight * b) / total
            }
            (Some(p), None) => p,
            (None, Some(b)) => b,
            (None, None) => {
                return Err(DataError::Missing {
                    code: data.code.to_string(),
                    factor: self.kind(),
                    input: "per/pbr".to_string(),
                });
            }
        };

        let mut reading = FactorReading::new((c.scale * blended).tanh());
        if let Some(per) = per {
            reading = reading.with_detail("per", per);
        }
        if let Some(pbr) = pbr {
            reading = reading.with_detail("pbr", pbr);
        }
        Ok(reading)
    }
}
