//! Market data snapshot loaded from one JSON document.
//!
//! ```json
//! {
//!   "snapshot_id": "krx-20250630",
//!   "date": "2025-06-30",
//!   "quality_gate": { "passed": true, "coverage": 0.99 },
//!   "account": { "cash": "100000000", "holdings": [] },
//!   "instruments": [
//!     {
//!       "code": "005930",
//!       "name": "Samsung Electronics",
//!       "sector": "IT",
//!       "bars": [ { "date": "2025-06-27", "open": 1.0, "high": 1.0, "low": 1.0,
//!                   "close": 1.0, "volume": 1.0, "traded_value": 1.0 } ],
//!       "fundamentals": { "per": 12.0, "pbr": 1.1, "roe": 0.1, "debt_ratio": 0.4 },
//!       "flows": [],
//!       "events": []
//!     }
//!   ]
//! }
//! ```
//!
//! Instruments with an `excluded` reason are listed in the universe's
//! exclusions rather than its codes.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::application::ports::{QualityGateError, UniverseProvider};
use crate::domain::portfolio::{Holding, InstrumentLiquidity, PortfolioContext};
use crate::domain::shared::InstrumentCode;
use crate::domain::signals::{
    DailyBar, DataError, Fundamentals, InstrumentDataRepository, InstrumentProfile, InvestorFlow,
    QualityGateReport, ScoredEvent, Universe,
};
use crate::domain::signals::value_objects::average_traded_value;

const ADTV_WINDOW: usize = 20;

/// Snapshot loading error.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// File could not be read.
    #[error("failed to read market snapshot {path}: {source}")]
    Io {
        /// Snapshot path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Document is not a valid snapshot.
    #[error("failed to parse market snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// Same code appears more than once.
    #[error("duplicate instrument {0} in market snapshot")]
    DuplicateInstrument(InstrumentCode),
}

/// Cash and positions at the snapshot date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Available cash.
    pub cash: Decimal,
    /// Current holdings.
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

/// Raw data for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Sector label.
    #[serde(default)]
    pub sector: Option<String>,
    /// Reason the upstream filter excluded the instrument.
    #[serde(default)]
    pub excluded: Option<String>,
    /// Daily bars.
    #[serde(default)]
    pub bars: Vec<DailyBar>,
    /// Latest fundamentals.
    #[serde(default)]
    pub fundamentals: Option<Fundamentals>,
    /// Investor flows.
    #[serde(default)]
    pub flows: Vec<InvestorFlow>,
    /// Scored events.
    #[serde(default)]
    pub events: Vec<ScoredEvent>,
}

/// On-disk snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Upstream snapshot identifier.
    pub snapshot_id: String,
    /// Date the snapshot was taken for.
    pub date: NaiveDate,
    /// Upstream quality gate verdict.
    #[serde(default)]
    pub quality_gate: Option<QualityGateReport>,
    /// Account state.
    #[serde(default)]
    pub account: AccountSnapshot,
    /// Instrument data.
    #[serde(default)]
    pub instruments: Vec<InstrumentRecord>,
}

/// `InstrumentDataRepository` and `UniverseProvider` over a [`MarketSnapshot`].
///
/// Series are sorted by date on load so lookback windows are cheap slices.
#[derive(Debug, Clone)]
pub struct JsonSnapshotRepository {
    snapshot_id: String,
    date: NaiveDate,
    quality_gate: Option<QualityGateReport>,
    account: AccountSnapshot,
    instruments: BTreeMap<InstrumentCode, InstrumentRecord>,
}

impl JsonSnapshotRepository {
    /// Load a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let repo = Self::from_json(&contents)?;
        info!(
            path = %path.display(),
            snapshot_id = %repo.snapshot_id,
            instruments = repo.instruments.len(),
            "Market snapshot loaded"
        );
        Ok(repo)
    }

    /// Parse a snapshot document.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid JSON or duplicate instruments.
    pub fn from_json(contents: &str) -> Result<Self, SnapshotError> {
        let snapshot: MarketSnapshot = serde_json::from_str(contents)?;
        Self::from_snapshot(snapshot)
    }

    /// Index an in-memory snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate instruments.
    pub fn from_snapshot(snapshot: MarketSnapshot) -> Result<Self, SnapshotError> {
        let mut instruments = BTreeMap::new();
        for mut record in snapshot.instruments {
            record.bars.sort_by_key(|bar| bar.date);
            record.flows.sort_by_key(|flow| flow.date);
            record.events.sort_by_key(|event| event.date);
            let code = record.code.clone();
            if instruments.insert(code.clone(), record).is_some() {
                return Err(SnapshotError::DuplicateInstrument(code));
            }
        }
        Ok(Self {
            snapshot_id: snapshot.snapshot_id,
            date: snapshot.date,
            quality_gate: snapshot.quality_gate,
            account: snapshot.account,
            instruments,
        })
    }

    /// Upstream snapshot identifier.
    #[must_use]
    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    /// Account state.
    #[must_use]
    pub const fn account(&self) -> &AccountSnapshot {
        &self.account
    }

    /// Latest close on or before `as_of`.
    #[must_use]
    pub fn last_price(&self, code: &InstrumentCode, as_of: NaiveDate) -> Option<Decimal> {
        let record = self.instruments.get(code)?;
        let bars = up_to(&record.bars, as_of, |bar| bar.date);
        bars.last().and_then(|bar| Decimal::from_f64(bar.close))
    }

    /// Capital, holdings, prices and liquidity as of `as_of`.
    ///
    /// Instruments with fewer than 20 bars get no liquidity entry, so the
    /// constructor treats their ADTV and sector as unknown.
    #[must_use]
    pub fn portfolio_context(&self, as_of: NaiveDate) -> PortfolioContext {
        let mut context = PortfolioContext::default();

        for (code, record) in &self.instruments {
            if let Some(price) = self.last_price(code, as_of) {
                context.prices.insert(code.clone(), price);
            }
            let bars = up_to(&record.bars, as_of, |bar| bar.date);
            let adtv = average_traded_value(bars, ADTV_WINDOW).and_then(Decimal::from_f64);
            if let Some(adtv20) = adtv {
                context.liquidity.insert(
                    code.clone(),
                    InstrumentLiquidity {
                        sector: record.sector.clone().unwrap_or_default(),
                        adtv20,
                    },
                );
            }
        }

        for holding in &self.account.holdings {
            context.holdings.insert(holding.code.clone(), holding.clone());
        }
        let invested: Decimal = context
            .holdings
            .keys()
            .map(|code| context.current_value(code))
            .sum();
        context.total_capital = self.account.cash + invested;
        context
    }

    fn record(&self, code: &InstrumentCode) -> Option<&InstrumentRecord> {
        self.instruments.get(code)
    }
}

/// Prefix of a date-sorted slice with dates on or before `as_of`.
fn up_to<T>(items: &[T], as_of: NaiveDate, date: impl Fn(&T) -> NaiveDate) -> &[T] {
    let end = items.partition_point(|item| date(item) <= as_of);
    &items[..end]
}

fn last_n<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

impl InstrumentDataRepository for JsonSnapshotRepository {
    fn daily_bars(
        &self,
        code: &InstrumentCode,
        as_of: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<DailyBar>, DataError> {
        Ok(self.record(code).map_or_else(Vec::new, |r| {
            last_n(up_to(&r.bars, as_of, |b| b.date), lookback).to_vec()
        }))
    }

    fn fundamentals(
        &self,
        code: &InstrumentCode,
        _as_of: NaiveDate,
    ) -> Result<Option<Fundamentals>, DataError> {
        Ok(self.record(code).and_then(|r| r.fundamentals.clone()))
    }

    fn investor_flows(
        &self,
        code: &InstrumentCode,
        as_of: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<InvestorFlow>, DataError> {
        Ok(self.record(code).map_or_else(Vec::new, |r| {
            last_n(up_to(&r.flows, as_of, |f| f.date), lookback).to_vec()
        }))
    }

    fn events(
        &self,
        code: &InstrumentCode,
        as_of: NaiveDate,
        lookback_days: i64,
    ) -> Result<Vec<ScoredEvent>, DataError> {
        let since = as_of - chrono::Duration::days(lookback_days);
        Ok(self.record(code).map_or_else(Vec::new, |r| {
            up_to(&r.events, as_of, |e| e.date)
                .iter()
                .filter(|e| e.date > since)
                .cloned()
                .collect()
        }))
    }

    fn profile(&self, code: &InstrumentCode) -> Result<Option<InstrumentProfile>, DataError> {
        Ok(self.record(code).map(|r| InstrumentProfile {
            name: if r.name.is_empty() {
                code.to_string()
            } else {
                r.name.clone()
            },
            sector: r.sector.clone().unwrap_or_default(),
        }))
    }
}

impl UniverseProvider for JsonSnapshotRepository {
    fn universe(&self, date: NaiveDate) -> Result<Universe, QualityGateError> {
        let mut universe = Universe::new(
            self.date,
            self.instruments
                .values()
                .filter(|r| r.excluded.is_none())
                .map(|r| r.code.clone()),
        );
        universe.excluded = self
            .instruments
            .values()
            .filter_map(|r| r.excluded.clone().map(|reason| (r.code.clone(), reason)))
            .collect();
        universe.snapshot_id.clone_from(&self.snapshot_id);
        universe.quality_gate.clone_from(&self.quality_gate);

        if universe.date != date {
            return Err(QualityGateError::DateMismatch {
                expected: date,
                actual: universe.date,
            });
        }
        Ok(universe)
    }
}
