//! Signals Bounded Context
//!
//! Turns raw per-instrument market data into six bounded factor scores.
//!
//! # Key Concepts
//!
//! - **Factor Calculators**: momentum, technical, value, quality, flow, event
//! - **Normalizer**: winsorize, cross-sectional z-score, clip, rescale
//! - **Signal Engine**: bounded worker pool producing an immutable `SignalSet`
//!
//! A calculator failure for one instrument yields a neutral score for that
//! factor only and is reported as a warning.

pub mod engine;
pub mod errors;
pub mod factors;
pub mod normalizer;
pub mod repository;
pub mod value_objects;

pub use engine::{SignalBuildReport, SignalEngine, SignalWarning};
pub use errors::{DataError, SignalError};
pub use factors::FactorCalculator;
pub use normalizer::Normalizer;
pub use repository::InstrumentDataRepository;
pub use value_objects::{
    DailyBar, FactorKind, FactorReading, FactorScores, Fundamentals, InstrumentData,
    InstrumentProfile, InvestorFlow, QualityGateReport, ScoredEvent, SignalSet, StockSignals,
    Universe,
};
