//! Shared Domain Types
//!
//! Identifiers shared across bounded contexts.

pub mod value_objects;

pub use value_objects::{BrokerId, InstrumentCode, OrderId, RunId, StrategyId};
