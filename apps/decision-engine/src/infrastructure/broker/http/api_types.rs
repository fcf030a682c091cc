//! Request and response bodies of the generic REST broker API.
//!
//! Order status, balances and holdings use the port's own types on the
//! wire; only bodies that differ from them are declared here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{OrderAck, SubmitOrderRequest};
use crate::domain::order_execution::OrderStatus;
use crate::domain::shared::{BrokerId, InstrumentCode, OrderId};

/// `POST /orders` body.
#[derive(Debug, Serialize)]
pub struct OrderRequestBody<'a> {
    /// Account the order is placed for.
    pub account_id: &'a str,
    /// The order.
    #[serde(flatten)]
    pub order: &'a SubmitOrderRequest,
}

/// `POST /orders` response.
#[derive(Debug, Deserialize)]
pub struct OrderResponseBody {
    /// Broker order id.
    pub order_id: String,
    /// Echoed client order id.
    pub client_order_id: String,
    /// Status at acknowledgment.
    pub status: OrderStatus,
}

impl OrderResponseBody {
    /// Convert to the port acknowledgment.
    #[must_use]
    pub fn into_ack(self) -> OrderAck {
        OrderAck {
            broker_order_id: BrokerId::new(self.order_id),
            client_order_id: OrderId::new(self.client_order_id),
            status: self.status,
        }
    }
}

/// `GET /quotes/{code}` response.
#[derive(Debug, Deserialize)]
pub struct QuoteBody {
    /// Instrument.
    pub code: InstrumentCode,
    /// Last traded price.
    pub price: Decimal,
}

/// `POST /oauth2/token` body.
#[derive(Debug, Serialize)]
pub struct TokenRequestBody<'a> {
    /// Always `client_credentials`.
    pub grant_type: &'static str,
    /// Application key.
    pub app_key: &'a str,
    /// Application secret.
    pub app_secret: &'a str,
}

/// `POST /oauth2/token` response.
#[derive(Debug, Deserialize)]
pub struct TokenResponseBody {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `INSUFFICIENT_FUNDS`.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}
