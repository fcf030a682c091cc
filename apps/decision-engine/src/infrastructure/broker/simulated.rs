//! Deterministic in-process broker.
//!
//! Orders fill in equal steps, one step per status poll, at the last price
//! moved against the order by a fixed slippage and capped by the limit.
//! Broker ids are sequential, so identical submissions produce identical
//! histories.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

use crate::application::ports::{
    AccountBalance, Broker, BrokerError, OrderAck, RequestContext, SubmitOrderRequest,
};
use crate::domain::order_execution::{OrderSide, OrderStatus, OrderType, OrderUpdate};
use crate::domain::portfolio::Holding;
use crate::domain::shared::{BrokerId, InstrumentCode, OrderId};

#[derive(Debug, Clone)]
struct SimOrder {
    request: SubmitOrderRequest,
    status: OrderStatus,
    filled: u64,
    notional: Decimal,
}

impl SimOrder {
    fn avg_price(&self) -> Option<Decimal> {
        (self.filled > 0).then(|| self.notional / Decimal::from(self.filled))
    }
}

#[derive(Debug, Default)]
struct Book {
    cash: Decimal,
    prices: BTreeMap<InstrumentCode, Decimal>,
    holdings: BTreeMap<InstrumentCode, Holding>,
    orders: BTreeMap<BrokerId, SimOrder>,
    by_client_id: BTreeMap<OrderId, BrokerId>,
    next_id: u64,
}

/// Simulated broker.
#[derive(Debug)]
pub struct SimulatedBroker {
    book: Mutex<Book>,
    clock: DateTime<Utc>,
    fill_steps: u64,
    slippage: Decimal,
}

impl SimulatedBroker {
    /// Broker with `cash` and a fixed report time.
    #[must_use]
    pub fn new(cash: Decimal, clock: DateTime<Utc>) -> Self {
        Self {
            book: Mutex::new(Book {
                cash,
                ..Book::default()
            }),
            clock,
            fill_steps: 1,
            slippage: Decimal::ZERO,
        }
    }

    /// Set the last price of an instrument.
    #[must_use]
    pub fn with_price(self, code: InstrumentCode, price: Decimal) -> Self {
        self.book.lock().prices.insert(code, price);
        self
    }

    /// Add an existing holding.
    #[must_use]
    pub fn with_holding(self, holding: Holding) -> Self {
        self.book.lock().holdings.insert(holding.code.clone(), holding);
        self
    }

    /// Fill each order over `steps` polls.
    #[must_use]
    pub fn with_fill_steps(mut self, steps: u64) -> Self {
        self.fill_steps = steps.max(1);
        self
    }

    /// Move fill prices against the order by `bps`.
    #[must_use]
    pub fn with_slippage_bps(mut self, bps: f64) -> Self {
        self.slippage = Decimal::from_f64(bps / 10_000.0).unwrap_or(Decimal::ZERO);
        self
    }

    fn fill_price(&self, request: &SubmitOrderRequest, market: Decimal) -> Option<Decimal> {
        let price = match request.side {
            OrderSide::Buy => market * (Decimal::ONE + self.slippage),
            OrderSide::Sell => market * (Decimal::ONE - self.slippage),
        };
        match (request.order_type, request.limit_price) {
            (OrderType::Limit, Some(limit)) => match request.side {
                OrderSide::Buy if limit < market => None,
                OrderSide::Sell if limit > market => None,
                OrderSide::Buy => Some(price.min(limit)),
                OrderSide::Sell => Some(price.max(limit)),
            },
            _ => Some(price),
        }
    }

    fn advance(&self, book: &mut Book, broker_order_id: &BrokerId) -> Result<(), BrokerError> {
        let order = book
            .orders
            .get(broker_order_id)
            .cloned()
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: broker_order_id.to_string(),
            })?;
        if order.status.is_terminal() {
            return Ok(());
        }

        let code = &order.request.code;
        let Some(market) = book.prices.get(code).copied() else {
            return Ok(());
        };
        let Some(price) = self.fill_price(&order.request, market) else {
            return Ok(());
        };

        let step = order.request.quantity.div_ceil(self.fill_steps);
        let quantity = step.min(order.request.quantity - order.filled);
        let value = price * Decimal::from(quantity);

        match order.request.side {
            OrderSide::Buy => {
                book.cash -= value;
                let holding = book.holdings.entry(code.clone()).or_insert_with(|| Holding {
                    code: code.clone(),
                    quantity: 0,
                    average_price: Decimal::ZERO,
                });
                let total = Decimal::from(holding.quantity + quantity);
                holding.average_price =
                    (holding.average_price * Decimal::from(holding.quantity) + value) / total;
                holding.quantity += quantity;
            }
            OrderSide::Sell => {
                book.cash += value;
                if let Some(holding) = book.holdings.get_mut(code) {
                    holding.quantity = holding.quantity.saturating_sub(quantity);
                    if holding.quantity == 0 {
                        book.holdings.remove(code);
                    }
                }
            }
        }

        if let Some(entry) = book.orders.get_mut(broker_order_id) {
            entry.filled += quantity;
            entry.notional += value;
            entry.status = if entry.filled == entry.request.quantity {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            debug!(broker_order_id = %broker_order_id, filled = entry.filled, status = ?entry.status, "Simulated fill");
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for SimulatedBroker {
    async fn submit_order(
        &self,
        request: &SubmitOrderRequest,
        _ctx: &RequestContext,
    ) -> Result<OrderAck, BrokerError> {
        let mut book = self.book.lock();

        if let Some(existing) = book.by_client_id.get(&request.client_order_id) {
            let status = book.orders.get(existing).map_or(OrderStatus::Submitted, |o| o.status);
            return Ok(OrderAck {
                broker_order_id: existing.clone(),
                client_order_id: request.client_order_id.clone(),
                status,
            });
        }

        let Some(market) = book.prices.get(&request.code).copied() else {
            return Err(BrokerError::OrderRejected {
                reason: format!("unknown instrument {}", request.code),
            });
        };
        match request.side {
            OrderSide::Buy => {
                let reserve = request.limit_price.unwrap_or(market) * Decimal::from(request.quantity);
                if reserve > book.cash {
                    return Err(BrokerError::InsufficientFunds);
                }
            }
            OrderSide::Sell => {
                let held = book.holdings.get(&request.code).map_or(0, |h| h.quantity);
                if request.quantity > held {
                    return Err(BrokerError::OrderRejected {
                        reason: format!("sell of {} exceeds holding of {held}", request.quantity),
                    });
                }
            }
        }

        book.next_id += 1;
        let broker_order_id = BrokerId::new(format!("SIM-{:06}", book.next_id));
        book.orders.insert(
            broker_order_id.clone(),
            SimOrder {
                request: request.clone(),
                status: OrderStatus::Submitted,
                filled: 0,
                notional: Decimal::ZERO,
            },
        );
        book.by_client_id
            .insert(request.client_order_id.clone(), broker_order_id.clone());

        Ok(OrderAck {
            broker_order_id,
            client_order_id: request.client_order_id.clone(),
            status: OrderStatus::Submitted,
        })
    }

    async fn cancel_order(
        &self,
        broker_order_id: &BrokerId,
        _ctx: &RequestContext,
    ) -> Result<(), BrokerError> {
        let mut book = self.book.lock();
        let order = book
            .orders
            .get_mut(broker_order_id)
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: broker_order_id.to_string(),
            })?;
        if !order.status.is_terminal() {
            order.status = OrderStatus::Cancelled;
        }
        Ok(())
    }

    async fn get_order_status(
        &self,
        broker_order_id: &BrokerId,
        _ctx: &RequestContext,
    ) -> Result<OrderUpdate, BrokerError> {
        let mut book = self.book.lock();
        self.advance(&mut book, broker_order_id)?;
        let order = book
            .orders
            .get(broker_order_id)
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: broker_order_id.to_string(),
            })?;
        Ok(OrderUpdate {
            status: order.status,
            filled_quantity: order.filled,
            avg_fill_price: order.avg_price(),
            updated_at: self.clock,
        })
    }

    async fn get_current_price(
        &self,
        code: &InstrumentCode,
        _ctx: &RequestContext,
    ) -> Result<Decimal, BrokerError> {
        self.book
            .lock()
            .prices
            .get(code)
            .copied()
            .ok_or_else(|| BrokerError::Unknown {
                message: format!("no price for {code}"),
            })
    }

    async fn get_balance(&self, _ctx: &RequestContext) -> Result<AccountBalance, BrokerError> {
        let book = self.book.lock();
        let holdings_value: Decimal = book
            .holdings
            .values()
            .map(|h| {
                let price = book.prices.get(&h.code).copied().unwrap_or(h.average_price);
                price * Decimal::from(h.quantity)
            })
            .sum();
        Ok(AccountBalance {
            cash: book.cash,
            total_equity: book.cash + holdings_value,
            as_of: self.clock,
        })
    }

    async fn get_holdings(&self, _ctx: &RequestContext) -> Result<Vec<Holding>, BrokerError> {
        Ok(self.book.lock().holdings.values().cloned().collect())
    }

    fn supports_idempotent_submission(&self) -> bool {
        true
    }
}
