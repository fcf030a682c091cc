//! Portfolio construction errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while constructing a target portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortfolioError {
    /// Fewer candidates than holding slots while strict counting is on.
    #[error("insufficient candidates: {available} available, {required} required")]
    InsufficientCandidates {
        /// Candidates available.
        available: usize,
        /// Slots configured.
        required: usize,
    },

    /// Total capital must be positive.
    #[error("total capital must be positive, got {capital}")]
    NonPositiveCapital {
        /// Reported capital.
        capital: Decimal,
    },
}
