//! Per-instrument signals and the sealed signal set.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{FactorKind, FactorScores};
use crate::domain::shared::InstrumentCode;

/// Six factor scores for one instrument plus the inputs behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSignals {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Display name.
    pub name: String,
    /// Normalized scores.
    pub scores: FactorScores,
    /// Raw inputs per factor (returns, RSI, PER, net flow...).
    pub details: BTreeMap<FactorKind, BTreeMap<String, f64>>,
    /// Factors that fell back to the neutral score.
    pub neutral_factors: BTreeSet<FactorKind>,
    /// Time the signals were computed for.
    pub updated_at: DateTime<Utc>,
}

impl StockSignals {
    /// Signals with the given scores and no details.
    #[must_use]
    pub fn new(
        code: InstrumentCode,
        name: impl Into<String>,
        scores: FactorScores,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            scores,
            details: BTreeMap::new(),
            neutral_factors: BTreeSet::new(),
            updated_at,
        }
    }

    /// A named raw input of a factor.
    #[must_use]
    pub fn detail(&self, factor: FactorKind, name: &str) -> Option<f64> {
        self.details.get(&factor)?.get(name).copied()
    }
}

/// Signals for every instrument of one cycle. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    date: NaiveDate,
    signals: BTreeMap<InstrumentCode, StockSignals>,
}

impl SignalSet {
    /// Seal a set of signals.
    #[must_use]
    pub fn new(date: NaiveDate, signals: impl IntoIterator<Item = StockSignals>) -> Self {
        Self {
            date,
            signals: signals
                .into_iter()
                .map(|s| (s.code.clone(), s))
                .collect(),
        }
    }

    /// Decision date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Signals of one instrument.
    #[must_use]
    pub fn get(&self, code: &InstrumentCode) -> Option<&StockSignals> {
        self.signals.get(code)
    }

    /// Iterate in code order.
    pub fn iter(&self) -> impl Iterator<Item = &StockSignals> {
        self.signals.values()
    }

    /// Number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
