//! Order execution errors.

use thiserror::Error;

use super::value_objects::OrderStatus;

/// Errors that can occur in order execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Invalid state transition attempted.
    #[error("Invalid order state transition: {from} -> {to}: {reason}")]
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Reported fill quantity exceeds the order quantity.
    #[error("Fill quantity {filled} exceeds order quantity {quantity}")]
    FillExceedsQuantity {
        /// Filled quantity reported.
        filled: u64,
        /// Order quantity.
        quantity: u64,
    },

    /// Reported fill quantity went backwards.
    #[error("Fill quantity decreased from {previous} to {reported}")]
    FillRegressed {
        /// Previously recorded fill quantity.
        previous: u64,
        /// Newly reported fill quantity.
        reported: u64,
    },

    /// Invalid order parameters.
    #[error("Invalid order parameter '{field}': {message}")]
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_error_invalid_state_transition_display() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Filled,
            reason: "Order was never submitted".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PENDING"));
        assert!(msg.contains("FILLED"));
    }

    #[test]
    fn order_error_invalid_parameters_display() {
        let err = OrderError::InvalidParameters {
            field: "quantity".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid order parameter 'quantity': must be positive"
        );
    }
}
