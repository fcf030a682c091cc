//! Event: corporate events weighted by exponential recency decay.

use chrono::NaiveDate;

use super::FactorCalculator;
use crate::config::EventConfig;
use crate::domain::signals::errors::DataError;
use crate::domain::signals::value_objects::{FactorKind, FactorReading, InstrumentData};

/// Event calculator.
#[derive(Debug, Clone)]
pub struct EventCalculator {
    config: EventConfig,
}

impl EventCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(config: EventConfig) -> Self {
        Self { config }
    }

    /// Decay weight of an event `age_days` old, floored at `min_weight`.
    fn weight(&self, age_days: i64) -> f64 {
        let decay = (-std::f64::consts::LN_2 * age_days as f64 / self.config.half_life_days).exp();
        decay.max(self.config.min_weight)
    }
}

impl FactorCalculator for EventCalculator {
    fn kind(&self) -> FactorKind {
        FactorKind::Event
    }

    fn compute(&self, data: &InstrumentData, as_of: NaiveDate) -> Result<FactorReading, DataError> {
        let c = &self.config;
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut count = 0usize;

        for event in &data.events {
            let age = (as_of - event.date).num_days();
            if age < 0 || age > c.lookback_days || !event.score.is_finite() {
                continue;
            }
            let w = self.weight(age);
            weighted += w * (event.score / c.max_abs_score).clamp(-1.0, 1.0);
            total_weight += w;
            count += 1;
        }

        if count == 0 {
            return Err(DataError::Insufficient {
                code: data.code.to_string(),
                factor: self.kind(),
                required: 1,
                available: 0,
            });
        }

        Ok(FactorReading::new((weighted / total_weight).clamp(-1.0, 1.0))
            .with_detail("event_count", count as f64)
            .with_detail("total_weight", total_weight))
    }
}
