//! Portfolio Bounded Context
//!
//! Turns a ranked candidate list into bounded, tiered target weights.
//!
//! Constraints are applied in a fixed order: tier weight, per-position
//! clamp, sector ceiling, liquidity cap, minimum-weight drop to cash.

mod constructor;
mod errors;
mod value_objects;

pub use constructor::PortfolioConstructor;
pub use errors::PortfolioError;
pub use value_objects::{
    Holding, InstrumentLiquidity, PortfolioContext, PositionAction, TargetPortfolio,
    TargetPosition,
};
