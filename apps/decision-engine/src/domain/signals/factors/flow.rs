//! Flow: foreign and institutional net buying relative to traded value.

use chrono::NaiveDate;

use super::{FactorCalculator, malformed, require};
use crate::config::FlowConfig;
use crate::domain::signals::errors::DataError;
use crate::domain::signals::value_objects::{
    FactorKind, FactorReading, InstrumentData, InvestorFlow, average_traded_value,
};

/// Flow calculator.
#[derive(Debug, Clone)]
pub struct FlowCalculator {
    config: FlowConfig,
}

impl FlowCalculator {
    /// Create a calculator.
    #[must_use]
    pub const fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    /// Mean daily net value of one investor class over the last `window` days.
    fn mean_net(flows: &[InvestorFlow], window: usize, pick: fn(&InvestorFlow) -> f64) -> f64 {
        let recent = &flows[flows.len().saturating_sub(window)..];
        if recent.is_empty() {
            return 0.0;
        }
        recent.iter().map(pick).sum::<f64>() / recent.len() as f64
    }
}

impl FactorCalculator for FlowCalculator {
    fn kind(&self) -> FactorKind {
        FactorKind::Flow
    }

    fn bars_required(&self) -> usize {
        self.config.adtv_window
    }

    fn flows_required(&self) -> usize {
        self.config.long_window
    }

    fn compute(&self, data: &InstrumentData, _as_of: NaiveDate) -> Result<FactorReading, DataError> {
        let c = &self.config;
        require(data, self.kind(), c.long_window, data.flows.len())?;
        require(data, self.kind(), c.adtv_window, data.bars.len())?;

        let adtv = average_traded_value(&data.bars, c.adtv_window)
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| malformed(data, "non-positive average traded value"))?;

        let intensity = |pick: fn(&InvestorFlow) -> f64| {
            let short = Self::mean_net(&data.flows, c.short_window, pick) / adtv;
            let long = Self::mean_net(&data.flows, c.long_window, pick) / adtv;
            (c.short_weight * short + c.long_weight * long) / (c.short_weight + c.long_weight)
        };
        let foreign = intensity(|f| f.foreign_net);
        let institution = intensity(|f| f.institution_net);

        let blended = (c.foreign_weight * foreign + c.institution_weight * institution)
            / (c.foreign_weight + c.institution_weight);

        Ok(FactorReading::new((c.scale * blended).tanh())
            .with_detail("adtv", adtv)
            .with_detail("foreign_intensity", foreign)
            .with_detail("institution_intensity", institution))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::signals::factors::test_support::{as_of, bars_from_closes};

    fn data(foreign: f64, institution: f64, days: usize) -> InstrumentData {
        let mut data = InstrumentData::new(crate::domain::shared::InstrumentCode::new("TEST"));
        data.bars = bars_from_closes(&vec![100.0; 20]);
        data.flows = (0..days)
            .map(|i| InvestorFlow {
                date: as_of() - Duration::days((days - 1 - i) as i64),
                foreign_net: foreign,
                institution_net: institution,
            })
            .collect();
        data
    }

    fn calculator() -> FlowCalculator {
        FlowCalculator::new(FlowConfig::default())
    }

    #[test]
    fn net_buying_is_positive() {
        // adtv = 100 * 1000 = 100_000; 1% of adtv per day from both classes
        let reading = calculator().compute(&data(1_000.0, 1_000.0, 20), as_of()).unwrap();
        assert!((reading.details["foreign_intensity"] - 0.01).abs() < 1e-12);
        assert!((reading.raw - 0.1_f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn net_selling_is_negative() {
        let reading = calculator().compute(&data(-5_000.0, 0.0, 20), as_of()).unwrap();
        assert!(reading.raw < 0.0);
    }

    #[test]
    fn short_flow_history_is_insufficient() {
        let result = calculator().compute(&data(1.0, 1.0, 5), as_of());
        assert!(matches!(
            result,
            Err(DataError::Insufficient { required: 20, available: 5, .. })
        ));
    }

    #[test]
    fn zero_traded_value_is_malformed() {
        let mut data = data(1.0, 1.0, 20);
        for bar in &mut data.bars {
            bar.traded_value = 0.0;
        }
        assert!(matches!(
            calculator().compute(&data, as_of()),
            Err(DataError::Malformed { .. })
        ));
    }
}
