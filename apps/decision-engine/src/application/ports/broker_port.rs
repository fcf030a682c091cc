//! Broker Port (Driven Port)
//!
//! Generic submit/cancel/query contract with a brokerage. Every call takes a
//! [`RequestContext`] carrying its deadline and a cancellation token.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::order_execution::{Order, OrderSide, OrderStatus, OrderType, OrderUpdate};
use crate::domain::portfolio::Holding;
use crate::domain::shared::{BrokerId, InstrumentCode, OrderId};

/// Deadline and cancellation for one broker call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Maximum time the call may take.
    pub timeout: Duration,
    /// Cancels the call when triggered.
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context with a fresh cancellation token.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Context with the same deadline, cancelled when `parent` is.
    #[must_use]
    pub fn child_of(timeout: Duration, parent: &CancellationToken) -> Self {
        Self {
            timeout,
            cancel: parent.child_token(),
        }
    }

    /// Run `fut` under this context's deadline and cancellation.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the deadline passes, `Cancelled` if the token is
    /// triggered first, otherwise the future's own result.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, BrokerError>
    where
        F: Future<Output = Result<T, BrokerError>> + Send,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(BrokerError::Cancelled),
            result = tokio::time::timeout(self.timeout, fut) => {
                result.unwrap_or(Err(BrokerError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                }))
            }
        }
    }
}

/// Request to submit an order to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    /// Client order ID (deterministic planner id).
    pub client_order_id: OrderId,
    /// Instrument to trade.
    pub code: InstrumentCode,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity in shares.
    pub quantity: u64,
    /// Limit price (for limit orders).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit_price: Option<Decimal>,
}

impl SubmitOrderRequest {
    /// Build the request for a planned order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            client_order_id: order.id().clone(),
            code: order.code().clone(),
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            limit_price: order.price(),
        }
    }
}

/// Acknowledgment from broker after order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker-assigned order ID.
    pub broker_order_id: BrokerId,
    /// Client order ID echoed back.
    pub client_order_id: OrderId,
    /// Status at acknowledgment.
    pub status: OrderStatus,
}

/// Cash position of the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Available cash.
    pub cash: Decimal,
    /// Cash plus holdings at market value.
    pub total_equity: Decimal,
    /// Time of the report.
    pub as_of: DateTime<Utc>,
}

/// Broker port error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Connection error.
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("Broker returned HTTP {status}: {message}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Credentials rejected or token could not be obtained.
    #[error("Broker authentication failed: {message}")]
    Authentication {
        /// Error details.
        message: String,
    },

    /// Order rejected by broker.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Order not found.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The missing order ID.
        order_id: String,
    },

    /// Insufficient funds.
    #[error("Insufficient buying power")]
    InsufficientFunds,

    /// Rate limited.
    #[error("Rate limited by broker")]
    RateLimited,

    /// Deadline passed.
    #[error("Broker call timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline that passed.
        timeout_ms: u64,
    },

    /// The caller cancelled the call.
    #[error("Broker call cancelled")]
    Cancelled,

    /// Malformed response.
    #[error("Broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

impl BrokerError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError { .. } | Self::RateLimited | Self::Timeout { .. } => true,
            Self::Http { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Whether the broker may have acted on the request despite the error.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        match self {
            Self::ConnectionError { .. } | Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// HTTP status codes worth retrying: request timeout, rate limit, 5xx.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

/// Port for broker interactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    /// Submit an order.
    async fn submit_order(
        &self,
        request: &SubmitOrderRequest,
        ctx: &RequestContext,
    ) -> Result<OrderAck, BrokerError>;

    /// Cancel an order.
    async fn cancel_order(
        &self,
        broker_order_id: &BrokerId,
        ctx: &RequestContext,
    ) -> Result<(), BrokerError>;

    /// Current status and fills of an order.
    async fn get_order_status(
        &self,
        broker_order_id: &BrokerId,
        ctx: &RequestContext,
    ) -> Result<OrderUpdate, BrokerError>;

    /// Latest traded price of an instrument.
    async fn get_current_price(
        &self,
        code: &InstrumentCode,
        ctx: &RequestContext,
    ) -> Result<Decimal, BrokerError>;

    /// Account cash and equity.
    async fn get_balance(&self, ctx: &RequestContext) -> Result<AccountBalance, BrokerError>;

    /// Current holdings.
    async fn get_holdings(&self, ctx: &RequestContext) -> Result<Vec<Holding>, BrokerError>;

    /// Whether submit and cancel are safe to repeat (deduplicated by client id).
    fn supports_idempotent_submission(&self) -> bool {
        false
    }
}
