//! Order Aggregate Root
//!
//! The Order aggregate carries a planned order from creation by the
//! execution planner through submission and fills at the broker.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{OrderSide, OrderStatus, OrderType, SliceInfo};
use crate::domain::shared::{BrokerId, InstrumentCode, OrderId};

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Deterministic order identifier.
    pub id: OrderId,
    /// Instrument to trade.
    pub code: InstrumentCode,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity in shares.
    pub quantity: u64,
    /// Limit price (required for limit orders, absent for market orders).
    pub price: Option<Decimal>,
    /// Price the plan was computed from.
    pub reference_price: Decimal,
    /// Expected slippage as a fraction of price.
    pub expected_slippage_pct: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Slice metadata when this order is part of a split.
    pub slice: Option<SliceInfo>,
}

impl CreateOrderCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns error if required parameters are missing or invalid.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.code.is_malformed() {
            return Err(OrderError::InvalidParameters {
                field: "code".to_string(),
                message: format!("malformed instrument code '{}'", self.code),
            });
        }

        if self.quantity == 0 {
            return Err(OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: "quantity must be positive".to_string(),
            });
        }

        match (self.order_type, self.price) {
            (OrderType::Limit, None) => Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: "Limit price required for limit orders".to_string(),
            }),
            (OrderType::Limit, Some(price)) if price <= Decimal::ZERO => {
                Err(OrderError::InvalidParameters {
                    field: "price".to_string(),
                    message: format!("limit price must be positive, got {price}"),
                })
            }
            (OrderType::Market, Some(_)) => Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: "Market orders carry no price".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Status report for an order, as observed at the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    /// Reported status.
    pub status: OrderStatus,
    /// Cumulative filled quantity.
    pub filled_quantity: u64,
    /// Average fill price of the filled quantity.
    pub avg_fill_price: Option<Decimal>,
    /// Time of the report.
    pub updated_at: DateTime<Utc>,
}

/// Order Aggregate Root.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    code: InstrumentCode,
    side: OrderSide,
    order_type: OrderType,
    quantity: u64,
    price: Option<Decimal>,
    reference_price: Decimal,
    expected_slippage_pct: f64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    filled_at: Option<DateTime<Utc>>,
    filled_quantity: u64,
    avg_fill_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    slice: Option<SliceInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    broker_order_id: Option<BrokerId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    reject_reason: Option<String>,
    needs_reconciliation: bool,
}

impl Order {
    /// Create a new pending order from a command.
    ///
    /// # Errors
    ///
    /// Returns error if command validation fails.
    pub fn new(cmd: CreateOrderCommand) -> Result<Self, OrderError> {
        cmd.validate()?;

        Ok(Self {
            id: cmd.id,
            code: cmd.code,
            side: cmd.side,
            order_type: cmd.order_type,
            quantity: cmd.quantity,
            price: cmd.price,
            reference_price: cmd.reference_price,
            expected_slippage_pct: cmd.expected_slippage_pct,
            status: OrderStatus::Pending,
            created_at: cmd.created_at,
            filled_at: None,
            filled_quantity: 0,
            avg_fill_price: None,
            slice: cmd.slice,
            broker_order_id: None,
            reject_reason: None,
            needs_reconciliation: false,
        })
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Order identifier.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Instrument code.
    #[must_use]
    pub const fn code(&self) -> &InstrumentCode {
        &self.code
    }

    /// Order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Quantity in shares.
    #[must_use]
    pub const fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Limit price, `None` for market orders.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        self.price
    }

    /// Price the plan was computed from.
    #[must_use]
    pub const fn reference_price(&self) -> Decimal {
        self.reference_price
    }

    /// Expected slippage as a fraction of price.
    #[must_use]
    pub const fn expected_slippage_pct(&self) -> f64 {
        self.expected_slippage_pct
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time the order became fully filled.
    #[must_use]
    pub const fn filled_at(&self) -> Option<DateTime<Utc>> {
        self.filled_at
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> u64 {
        self.filled_quantity
    }

    /// Average fill price.
    #[must_use]
    pub const fn avg_fill_price(&self) -> Option<Decimal> {
        self.avg_fill_price
    }

    /// Slice metadata, if this order is part of a split.
    #[must_use]
    pub const fn slice(&self) -> Option<&SliceInfo> {
        self.slice.as_ref()
    }

    /// Broker-assigned order identifier.
    #[must_use]
    pub const fn broker_order_id(&self) -> Option<&BrokerId> {
        self.broker_order_id.as_ref()
    }

    /// Reason the order was rejected, if any.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    /// Whether an operator must reconcile this order manually.
    #[must_use]
    pub const fn needs_reconciliation(&self) -> bool {
        self.needs_reconciliation
    }

    /// Nominal slot of this order relative to the decision time.
    #[must_use]
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.slice
            .as_ref()
            .map_or(self.created_at, |slice| slice.scheduled_at)
    }

    /// How long after the start of submission this order may be sent.
    #[must_use]
    pub fn submission_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.slice.as_ref().map_or(0, |slice| slice.offset_secs))
    }

    /// Planned notional (quantity times limit or reference price).
    #[must_use]
    pub fn notional(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price.unwrap_or(self.reference_price)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Record broker acceptance.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not pending.
    pub fn mark_submitted(&mut self, broker_order_id: BrokerId) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Submitted)?;
        self.status = OrderStatus::Submitted;
        self.broker_order_id = Some(broker_order_id);
        Ok(())
    }

    /// Record a rejection, either by the broker or before submission.
    ///
    /// # Errors
    ///
    /// Returns error if the order can no longer be rejected.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Rejected)?;
        self.status = OrderStatus::Rejected;
        self.reject_reason = Some(reason.into());
        Ok(())
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Returns error if the order is already terminal.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Cancelled)?;
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Flag the order for manual reconciliation.
    pub fn flag_for_reconciliation(&mut self) {
        self.needs_reconciliation = true;
    }

    /// Apply a broker status report.
    ///
    /// Returns `true` if the report changed the order. A report repeating the
    /// current status with the same fill quantity is a no-op (except for
    /// `PartiallyFilled`, which may legitimately repeat with more fills).
    ///
    /// # Errors
    ///
    /// Returns error if the transition is not allowed or the fill quantity
    /// is inconsistent.
    pub fn apply_update(&mut self, update: &OrderUpdate) -> Result<bool, OrderError> {
        if update.status == self.status && update.filled_quantity == self.filled_quantity {
            return Ok(false);
        }

        OrderStateMachine::validate_transition(self.status, update.status)?;

        if update.filled_quantity > self.quantity {
            return Err(OrderError::FillExceedsQuantity {
                filled: update.filled_quantity,
                quantity: self.quantity,
            });
        }
        if update.filled_quantity < self.filled_quantity {
            return Err(OrderError::FillRegressed {
                previous: self.filled_quantity,
                reported: update.filled_quantity,
            });
        }

        self.status = update.status;
        self.filled_quantity = update.filled_quantity;
        if update.avg_fill_price.is_some() {
            self.avg_fill_price = update.avg_fill_price;
        }
        if self.status == OrderStatus::Filled {
            self.filled_at = Some(update.updated_at);
        }
        Ok(true)
    }

    /// Realized slippage in basis points versus the planned reference price.
    ///
    /// Positive values are a cost: paying more on a buy, receiving less on a
    /// sell.
    #[must_use]
    pub fn realized_slippage_bps(&self) -> Option<f64> {
        let executed = self.avg_fill_price?;
        if self.reference_price <= Decimal::ZERO {
            return None;
        }
        let diff = (executed - self.reference_price) / self.reference_price;
        let bps = diff.to_f64()? * 10_000.0;
        Some(bps * f64::from(self.side.sign()))
    }
}
