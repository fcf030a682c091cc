//! Raw per-instrument inputs read from the data repository.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::shared::InstrumentCode;

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Trading date.
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Shares traded.
    pub volume: f64,
    /// Value traded in currency.
    pub traded_value: f64,
}

/// Latest fundamentals; any field may be unreported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Price / earnings.
    #[serde(default)]
    pub per: Option<f64>,
    /// Price / book.
    #[serde(default)]
    pub pbr: Option<f64>,
    /// Return on equity as a fraction.
    #[serde(default)]
    pub roe: Option<f64>,
    /// Total debt / equity.
    #[serde(default)]
    pub debt_ratio: Option<f64>,
}

/// Daily net buying value by investor class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorFlow {
    /// Trading date.
    pub date: NaiveDate,
    /// Net value bought by foreign investors.
    pub foreign_net: f64,
    /// Net value bought by institutions.
    pub institution_net: f64,
}

/// A corporate event pre-scored by type (-N..+N).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    /// Event date.
    pub date: NaiveDate,
    /// Event type label.
    pub kind: String,
    /// Pre-assigned score.
    pub score: f64,
}

/// Static instrument attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentProfile {
    /// Display name.
    pub name: String,
    /// Sector label used by the sector ceiling.
    pub sector: String,
}

/// Everything the calculators read for one instrument, oldest first.
#[derive(Debug, Clone)]
pub struct InstrumentData {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Daily bars up to the decision date.
    pub bars: Vec<DailyBar>,
    /// Latest fundamentals.
    pub fundamentals: Option<Fundamentals>,
    /// Investor flows up to the decision date.
    pub flows: Vec<InvestorFlow>,
    /// Scored events up to the decision date.
    pub events: Vec<ScoredEvent>,
}

impl InstrumentData {
    /// Empty inputs for an instrument.
    #[must_use]
    pub const fn new(code: InstrumentCode) -> Self {
        Self {
            code,
            bars: Vec::new(),
            fundamentals: None,
            flows: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Closing prices, oldest first.
    #[must_use]
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }
}

/// Mean traded value over the last `window` bars, `None` if fewer bars exist.
#[must_use]
pub fn average_traded_value(bars: &[DailyBar], window: usize) -> Option<f64> {
    if window == 0 || bars.len() < window {
        return None;
    }
    let recent = &bars[bars.len() - window..];
    Some(recent.iter().map(|bar| bar.traded_value).sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, traded_value: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 1.0,
            traded_value,
        }
    }

    #[test]
    fn adtv_uses_most_recent_window() {
        let bars = vec![bar(1, 1000.0), bar(2, 10.0), bar(3, 30.0)];
        assert_eq!(average_traded_value(&bars, 2), Some(20.0));
        assert_eq!(average_traded_value(&bars, 4), None);
    }
}
