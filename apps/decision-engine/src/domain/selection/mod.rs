//! Selection Bounded Context
//!
//! Hard-cut screening followed by a weighted ranking of the survivors.

mod ranker;
mod screener;

pub use ranker::{FactorBreakdown, RankedStock, Ranker};
pub use screener::Screener;
