//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;

pub use identifiers::{BrokerId, InstrumentCode, OrderId, RunId, StrategyId};
