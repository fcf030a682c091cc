//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status.
///
/// `Pending` is the only initial state. `Filled`, `Cancelled`, `Rejected`
/// and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order planned but not yet sent to the broker.
    Pending,
    /// Order accepted by the broker and working.
    Submitted,
    /// Order partially filled.
    PartiallyFilled,
    /// Order completely filled.
    Filled,
    /// Order cancelled.
    Cancelled,
    /// Order rejected (before or after submission).
    Rejected,
    /// Order expired (e.g. day order at market close).
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true if the order is working at the broker.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitted | Self::PartiallyFilled)
    }

    /// Returns true if the order can be cancelled.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Submitted | Self::PartiallyFilled
        )
    }

    /// Returns true if the order can receive fills.
    #[must_use]
    pub const fn can_fill(&self) -> bool {
        matches!(self, Self::Submitted | Self::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_is_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
    }

    #[test]
    fn order_status_in_flight() {
        assert!(!OrderStatus::Pending.is_in_flight());
        assert!(OrderStatus::Submitted.is_in_flight());
        assert!(OrderStatus::PartiallyFilled.is_in_flight());
        assert!(!OrderStatus::Filled.is_in_flight());
    }

    #[test]
    fn order_status_can_fill() {
        assert!(!OrderStatus::Pending.can_fill());
        assert!(OrderStatus::Submitted.can_fill());
        assert!(OrderStatus::PartiallyFilled.can_fill());
        assert!(!OrderStatus::Cancelled.can_fill());
    }

    #[test]
    fn order_status_display_matches_serde() {
        let json = serde_json::to_string(&OrderStatus::PartiallyFilled).unwrap();
        assert_eq!(json, "\"PARTIALLY_FILLED\"");
        assert_eq!(OrderStatus::PartiallyFilled.to_string(), "PARTIALLY_FILLED");
    }
}
