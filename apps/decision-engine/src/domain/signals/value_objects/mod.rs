//! Signal value objects.

mod factor;
mod market_data;
mod stock_signals;
mod universe;

pub use factor::{FactorKind, FactorReading, FactorScores};
pub use market_data::{
    DailyBar, Fundamentals, InstrumentData, InstrumentProfile, InvestorFlow, ScoredEvent,
    average_traded_value,
};
pub use stock_signals::{SignalSet, StockSignals};
pub use universe::{QualityGateReport, Universe};
