//! Per-order planning errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::order_execution::{OrderError, OrderSide};
use crate::domain::shared::InstrumentCode;

/// An order could not be planned. The batch continues without it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Target value buys or sells less than one share.
    #[error("{side:?} {code}: value {value} at price {price} is less than one share")]
    ZeroQuantity {
        /// Instrument code.
        code: InstrumentCode,
        /// Order side.
        side: OrderSide,
        /// Value to trade.
        value: Decimal,
        /// Current price.
        price: Decimal,
    },

    /// No usable current price.
    #[error("no positive current price for {code}")]
    MissingPrice {
        /// Instrument code.
        code: InstrumentCode,
    },

    /// The order failed aggregate validation.
    #[error("invalid order for {code}: {source}")]
    InvalidOrder {
        /// Instrument code.
        code: InstrumentCode,
        /// Validation failure.
        #[source]
        source: OrderError,
    },
}

impl ExecutionError {
    /// Stable machine-readable reason.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ZeroQuantity { .. } => "ZERO_QUANTITY",
            Self::MissingPrice { .. } => "MISSING_PRICE",
            Self::InvalidOrder { .. } => "INVALID_ORDER",
        }
    }

    /// Instrument the error refers to.
    #[must_use]
    pub const fn code(&self) -> &InstrumentCode {
        match self {
            Self::ZeroQuantity { code, .. }
            | Self::MissingPrice { code }
            | Self::InvalidOrder { code, .. } => code,
        }
    }
}
