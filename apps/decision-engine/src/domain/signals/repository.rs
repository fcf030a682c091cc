//! Read access to raw per-instrument data.

use chrono::NaiveDate;

use super::errors::DataError;
use super::value_objects::{DailyBar, Fundamentals, InstrumentProfile, InvestorFlow, ScoredEvent};
use crate::domain::shared::InstrumentCode;

/// Read-only source of raw instrument data.
///
/// Every method returns data dated on or before `as_of`, oldest first.
/// Implementations are shared across signal workers.
pub trait InstrumentDataRepository: Send + Sync {
    /// The most recent `lookback` daily bars.
    fn daily_bars(
        &self,
        code: &InstrumentCode,
        as_of: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<DailyBar>, DataError>;

    /// Latest fundamentals, if any were reported.
    fn fundamentals(
        &self,
        code: &InstrumentCode,
        as_of: NaiveDate,
    ) -> Result<Option<Fundamentals>, DataError>;

    /// The most recent `lookback` days of investor flows.
    fn investor_flows(
        &self,
        code: &InstrumentCode,
        as_of: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<InvestorFlow>, DataError>;

    /// Scored events within `lookback_days` calendar days.
    fn events(
        &self,
        code: &InstrumentCode,
        as_of: NaiveDate,
        lookback_days: i64,
    ) -> Result<Vec<ScoredEvent>, DataError>;

    /// Static profile (name, sector).
    fn profile(&self, code: &InstrumentCode) -> Result<Option<InstrumentProfile>, DataError>;
}
