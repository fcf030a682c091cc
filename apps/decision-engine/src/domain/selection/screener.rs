//! Hard-cut screening.

use tracing::debug;

use crate::config::ScreeningConfig;
use crate::domain::shared::InstrumentCode;
use crate::domain::signals::{FactorKind, SignalSet, StockSignals};

/// Conjunction of pass/fail thresholds over factor scores and fundamentals.
#[derive(Debug, Clone)]
pub struct Screener {
    config: ScreeningConfig,
}

impl Screener {
    /// Create a screener.
    #[must_use]
    pub const fn new(config: ScreeningConfig) -> Self {
        Self { config }
    }

    /// Codes passing every cut, sorted ascending.
    ///
    /// Pure: the same signal set and thresholds always yield the same list.
    #[must_use]
    pub fn screen(&self, signal_set: &SignalSet) -> Vec<InstrumentCode> {
        let passed: Vec<InstrumentCode> = signal_set
            .iter()
            .filter(|signals| self.passes(signals))
            .map(|signals| signals.code.clone())
            .collect();

        debug!(
            total = signal_set.len(),
            passed = passed.len(),
            "Screening complete"
        );
        passed
    }

    /// Whether one instrument passes every cut.
    #[must_use]
    pub fn passes(&self, signals: &StockSignals) -> bool {
        let c = &self.config;
        let scores = &signals.scores;
        if scores.momentum < c.min_momentum
            || scores.technical < c.min_technical
            || scores.flow < c.min_flow
        {
            return false;
        }

        // An unreported PER cannot satisfy an earnings cut.
        let per = signals.detail(FactorKind::Value, "per");
        if c.require_positive_earnings && !per.is_some_and(|per| per > 0.0) {
            return false;
        }
        if let Some(ceiling) = c.max_per {
            return per.is_some_and(|per| per > 0.0 && per <= ceiling);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::domain::signals::FactorScores;

    fn signals(code: &str, momentum: f64, technical: f64, flow: f64, per: Option<f64>) -> StockSignals {
        let scores = FactorScores {
            momentum,
            technical,
            flow,
            ..FactorScores::default()
        };
        let mut s = StockSignals::new(
            InstrumentCode::new(code),
            code,
            scores,
            Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
        );
        if let Some(per) = per {
            s.details
                .insert(FactorKind::Value, BTreeMap::from([("per".to_string(), per)]));
        }
        s
    }

    fn set() -> SignalSet {
        SignalSet::new(
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            vec![
                signals("D", 0.5, 0.1, 0.0, Some(30.0)),
                signals("A", 0.2, 0.0, 0.1, Some(8.0)),
                signals("B", -0.1, 0.5, 0.5, Some(10.0)),
                signals("C", 0.3, -0.9, 0.2, None),
                signals("E", 0.1, 0.1, -0.5, Some(-3.0)),
            ],
        )
    }

    #[test]
    fn applies_score_cuts_and_sorts() {
        let screener = Screener::new(ScreeningConfig::default());
        let codes = screener.screen(&set());
        assert_eq!(codes, vec![InstrumentCode::new("A"), InstrumentCode::new("D")]);
    }

    #[test]
    fn per_ceiling() {
        let screener = Screener::new(ScreeningConfig {
            max_per: Some(20.0),
            ..ScreeningConfig::default()
        });
        assert_eq!(screener.screen(&set()), vec![InstrumentCode::new("A")]);
    }

    #[test]
    fn positive_earnings_requires_reported_per() {
        let screener = Screener::new(ScreeningConfig {
            min_technical: -1.0,
            min_flow: -1.0,
            require_positive_earnings: true,
            ..ScreeningConfig::default()
        });
        let codes = screener.screen(&set());
        assert_eq!(codes, vec![InstrumentCode::new("A"), InstrumentCode::new("D")]);
    }

    #[test]
    fn screening_is_pure() {
        let screener = Screener::new(ScreeningConfig::default());
        let set = set();
        let first = screener.screen(&set);
        for _ in 0..10 {
            assert_eq!(screener.screen(&set), first);
        }
    }
}
