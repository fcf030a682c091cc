//! Execution Planning Bounded Context
//!
//! Converts target weights into quantity-correct, tick-correct,
//! liquidity-aware orders.
//!
//! # Key Concepts
//!
//! - **Planner**: sells first, then buys; floor quantities; limit pricing
//! - **Pricing**: tick-table rounding and ADTV slippage tiers
//! - **Splitter**: slices orders that are large relative to ADTV20

mod errors;
mod planner;
mod pricing;
mod splitter;

pub use errors::ExecutionError;
pub use planner::{ExecutionPlanner, PlanRejection, PlanResult, shares_for_value};
pub use pricing::{PriceRounding, expected_slippage, round_to_tick, tick_size};
pub use splitter::OrderSplitter;
