//! Order status transitions.
//!
//! - `PENDING` to `SUBMITTED`, `REJECTED` or `CANCELLED`
//! - `SUBMITTED` to `PARTIALLY_FILLED`, `FILLED`, `CANCELLED`, `REJECTED` or `EXPIRED`
//! - `PARTIALLY_FILLED` to itself, `FILLED`, `CANCELLED` or `EXPIRED`
//!
//! Rejection and cancellation before submission cover orders the broker
//! never saw: pre-trade validation failures and cycles cancelled mid-batch.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

use OrderStatus::{Cancelled, Expired, Filled, PartiallyFilled, Pending, Rejected, Submitted};

/// Validates order status transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Statuses reachable from `from` in one step. Empty for terminal states.
    #[must_use]
    pub const fn successors(from: OrderStatus) -> &'static [OrderStatus] {
        match from {
            Pending => &[Submitted, Rejected, Cancelled],
            Submitted => &[PartiallyFilled, Filled, Cancelled, Rejected, Expired],
            PartiallyFilled => &[PartiallyFilled, Filled, Cancelled, Expired],
            Filled | Cancelled | Rejected | Expired => &[],
        }
    }

    /// Whether `from -> to` is allowed.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        Self::successors(from).contains(&to)
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if `to` is not a successor of `from`.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            return Ok(());
        }
        let reason = match from {
            Filled => "order is already filled",
            Cancelled => "order is cancelled",
            Rejected => "order was rejected",
            Expired => "order has expired",
            Pending => "order was never submitted",
            Submitted | PartiallyFilled => "transition not allowed while working",
        };
        Err(OrderError::InvalidStateTransition {
            from,
            to,
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    const ALL: [OrderStatus; 7] = [
        Pending,
        Submitted,
        PartiallyFilled,
        Filled,
        Cancelled,
        Rejected,
        Expired,
    ];

    #[test_case(Pending, Rejected ; "pre-trade rejection")]
    #[test_case(Pending, Cancelled ; "cancelled before send")]
    #[test_case(Submitted, Expired ; "day order expiry")]
    #[test_case(PartiallyFilled, PartiallyFilled ; "repeated partial fill")]
    #[test_case(PartiallyFilled, Filled ; "fill completes")]
    fn allowed(from: OrderStatus, to: OrderStatus) {
        assert!(OrderStateMachine::validate_transition(from, to).is_ok());
    }

    #[test_case(Pending, Filled ; "fill without submission")]
    #[test_case(Pending, PartiallyFilled ; "partial without submission")]
    #[test_case(PartiallyFilled, Rejected ; "reject after fills")]
    #[test_case(Submitted, Pending ; "back to pending")]
    fn refused(from: OrderStatus, to: OrderStatus) {
        assert!(!OrderStateMachine::is_valid_transition(from, to));
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for status in ALL {
            assert_eq!(
                status.is_terminal(),
                OrderStateMachine::successors(status).is_empty(),
                "{status}"
            );
        }
    }

    #[test]
    fn error_names_the_terminal_state() {
        let err = OrderStateMachine::validate_transition(Filled, Cancelled).unwrap_err();
        assert!(err.to_string().contains("already filled"));
    }
}
