//! Upstream universe of eligible instruments.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::shared::InstrumentCode;

/// Data-coverage verdict of the upstream quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateReport {
    /// Whether coverage was sufficient.
    pub passed: bool,
    /// Fraction of expected data that was present.
    pub coverage: f64,
    /// Explanation when the gate failed.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Instruments eligible for one decision date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    /// Decision date.
    pub date: NaiveDate,
    /// Eligible codes.
    pub codes: BTreeSet<InstrumentCode>,
    /// Excluded codes with the exclusion reason.
    #[serde(default)]
    pub excluded: BTreeMap<InstrumentCode, String>,
    /// Upstream data-snapshot identifier.
    #[serde(default)]
    pub snapshot_id: String,
    /// Upstream quality-gate verdict, if one was produced.
    #[serde(default)]
    pub quality_gate: Option<QualityGateReport>,
}

impl Universe {
    /// Universe with the given codes and nothing excluded.
    #[must_use]
    pub fn new(date: NaiveDate, codes: impl IntoIterator<Item = InstrumentCode>) -> Self {
        Self {
            date,
            codes: codes.into_iter().collect(),
            excluded: BTreeMap::new(),
            snapshot_id: String::new(),
            quality_gate: None,
        }
    }

    /// Number of eligible codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no codes are eligible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
