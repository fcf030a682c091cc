//! Order Monitor Service
//!
//! Polls the broker for every in-flight order, applies status transitions,
//! records realized slippage and drops orders once terminal. Runs as a
//! background task stopped by a cancellation token.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::ports::{AuditRepository, Broker, RequestContext, SlippageRecord};
use crate::domain::order_execution::Order;
use crate::domain::shared::{OrderId, RunId};
use crate::observability::{record_monitor_tick, record_slippage};

struct TrackedOrder {
    run_id: RunId,
    order: Order,
}

/// Result of one polling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorTick {
    /// Orders polled.
    pub polled: usize,
    /// Orders whose state changed.
    pub updated: usize,
    /// Orders that reached a terminal state and were removed.
    pub completed: usize,
    /// Poll or transition failures.
    pub errors: usize,
}

/// Tracks in-flight orders until they are terminal.
pub struct OrderMonitor<B: Broker + ?Sized, A: AuditRepository + ?Sized> {
    broker: Arc<B>,
    audit: Arc<A>,
    request_timeout: Duration,
    active: RwLock<BTreeMap<OrderId, TrackedOrder>>,
    completed: Mutex<Vec<Order>>,
}

impl<B, A> OrderMonitor<B, A>
where
    B: Broker + ?Sized + 'static,
    A: AuditRepository + ?Sized + 'static,
{
    /// Create a monitor.
    #[must_use]
    pub fn new(broker: Arc<B>, audit: Arc<A>, request_timeout: Duration) -> Self {
        Self {
            broker,
            audit,
            request_timeout,
            active: RwLock::new(BTreeMap::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Start tracking an order. Only submitted, non-terminal orders with a
    /// broker id are tracked; returns whether the order was accepted.
    pub fn track(&self, run_id: &RunId, order: Order) -> bool {
        if !order.status().is_in_flight() || order.broker_order_id().is_none() {
            return false;
        }
        self.active.write().insert(
            order.id().clone(),
            TrackedOrder {
                run_id: run_id.clone(),
                order,
            },
        );
        true
    }

    /// Number of orders still in flight.
    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    /// Current state of a tracked order.
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.active.read().get(id).map(|t| t.order.clone())
    }

    /// Take the orders that reached a terminal state since the last call.
    pub fn drain_completed(&self) -> Vec<Order> {
        std::mem::take(&mut *self.completed.lock())
    }

    /// Poll every in-flight order once, concurrently.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> MonitorTick {
        let targets: Vec<(OrderId, crate::domain::shared::BrokerId)> = self
            .active
            .read()
            .values()
            .filter_map(|t| {
                t.order
                    .broker_order_id()
                    .map(|bid| (t.order.id().clone(), bid.clone()))
            })
            .collect();

        let polls = targets.iter().map(|(order_id, broker_id)| async move {
            let ctx = RequestContext::child_of(self.request_timeout, cancel);
            (order_id, self.broker.get_order_status(broker_id, &ctx).await)
        });
        let results = join_all(polls).await;

        let mut tick = MonitorTick {
            polled: targets.len(),
            ..MonitorTick::default()
        };
        let mut finished: Vec<(RunId, Order)> = Vec::new();

        for (order_id, result) in results {
            let update = match result {
                Ok(update) => update,
                Err(err) => {
                    warn!(order_id = %order_id, error = %err, "Order status poll failed");
                    tick.errors += 1;
                    continue;
                }
            };

            let mut active = self.active.write();
            let Some(tracked) = active.get_mut(order_id) else {
                continue;
            };
            match tracked.order.apply_update(&update) {
                Ok(true) => {
                    tick.updated += 1;
                    debug!(order_id = %order_id, status = ?update.status, filled = update.filled_quantity, "Order updated");
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(order_id = %order_id, error = %err, "Rejected broker status report");
                    tick.errors += 1;
                }
            }
            if tracked.order.status().is_terminal() {
                if let Some(done) = active.remove(order_id) {
                    finished.push((done.run_id, done.order));
                }
            }
        }

        for (run_id, order) in finished {
            self.record_slippage(&run_id, &order).await;
            tick.completed += 1;
            self.completed.lock().push(order);
        }

        record_monitor_tick(tick.completed, self.active_count());
        tick
    }

    async fn record_slippage(&self, run_id: &RunId, order: &Order) {
        let Some(record) = SlippageRecord::from_order(run_id, order, Utc::now()) else {
            return;
        };
        record_slippage(record.slippage_bps);
        info!(
            order_id = %order.id(),
            status = ?order.status(),
            slippage_bps = record.slippage_bps,
            "Order finished"
        );
        if let Err(err) = self.audit.save_slippage(&record).await {
            warn!(order_id = %order.id(), error = %err, "Failed to record slippage");
        }
    }

    /// Poll every `interval` until `cancel` fires.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        info!(interval_ms = interval.as_millis() as u64, "Order monitor started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {
                    self.poll_once(&cancel).await;
                }
            }
        }
        info!(remaining = self.active_count(), "Order monitor stopped");
    }

    /// Run the polling loop on a background task.
    pub fn spawn(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(interval, cancel).await })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::{BrokerError, MockBroker};
    use crate::domain::order_execution::{
        CreateOrderCommand, OrderSide, OrderStatus, OrderType, OrderUpdate,
    };
    use crate::domain::shared::{BrokerId, InstrumentCode};
    use crate::infrastructure::persistence::InMemoryAuditRepository;

    fn submitted(id: &str) -> Order {
        let mut order = Order::new(CreateOrderCommand {
            id: OrderId::new(id),
            code: InstrumentCode::new("A"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: 100,
            price: Some(dec!(10100)),
            reference_price: dec!(10000),
            expected_slippage_pct: 0.002,
            created_at: Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
            slice: None,
        })
        .unwrap();
        order.mark_submitted(BrokerId::new(format!("bk-{id}"))).unwrap();
        order
    }

    fn update(status: OrderStatus, filled: u64, price: Option<rust_decimal::Decimal>) -> OrderUpdate {
        OrderUpdate {
            status,
            filled_quantity: filled,
            avg_fill_price: price,
            updated_at: Utc.with_ymd_and_hms(2025, 6, 30, 1, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn filled_orders_are_removed_and_slippage_recorded() {
        let mut broker = MockBroker::new();
        broker.expect_get_order_status().returning(|bid, _| {
            if bid.as_str() == "bk-o1" {
                Ok(update(OrderStatus::Filled, 100, Some(dec!(10010))))
            } else {
                Ok(update(OrderStatus::PartiallyFilled, 40, Some(dec!(10000))))
            }
        });
        let audit = Arc::new(InMemoryAuditRepository::new());
        let monitor = OrderMonitor::new(Arc::new(broker), audit.clone(), Duration::from_secs(1));
        let run_id = RunId::new("run");
        assert!(monitor.track(&run_id, submitted("o1")));
        assert!(monitor.track(&run_id, submitted("o2")));

        let tick = monitor.poll_once(&CancellationToken::new()).await;

        assert_eq!(tick.polled, 2);
        assert_eq!(tick.updated, 2);
        assert_eq!(tick.completed, 1);
        assert_eq!(monitor.active_count(), 1);
        assert_eq!(
            monitor.order(&OrderId::new("o2")).unwrap().status(),
            OrderStatus::PartiallyFilled
        );

        let records = audit.slippage_records(&run_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!((records[0].slippage_bps - 10.0).abs() < 1e-9);
        assert_eq!(monitor.drain_completed().len(), 1);
    }

    #[tokio::test]
    async fn poll_failure_keeps_order_active() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_order_status()
            .returning(|_, _| Err(BrokerError::ConnectionError { message: "reset".to_string() }));
        let monitor = OrderMonitor::new(
            Arc::new(broker),
            Arc::new(InMemoryAuditRepository::new()),
            Duration::from_secs(1),
        );
        monitor.track(&RunId::new("run"), submitted("o1"));

        let tick = monitor.poll_once(&CancellationToken::new()).await;
        assert_eq!(tick.errors, 1);
        assert_eq!(monitor.active_count(), 1);
    }

    #[tokio::test]
    async fn invalid_transition_is_reported_not_applied() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_order_status()
            .returning(|_, _| Ok(update(OrderStatus::Pending, 0, None)));
        let monitor = OrderMonitor::new(
            Arc::new(broker),
            Arc::new(InMemoryAuditRepository::new()),
            Duration::from_secs(1),
        );
        monitor.track(&RunId::new("run"), submitted("o1"));

        let tick = monitor.poll_once(&CancellationToken::new()).await;
        assert_eq!(tick.errors, 1);
        assert_eq!(
            monitor.order(&OrderId::new("o1")).unwrap().status(),
            OrderStatus::Submitted
        );
    }

    #[test]
    fn pending_orders_are_not_tracked() {
        let monitor = OrderMonitor::new(
            Arc::new(MockBroker::new()),
            Arc::new(InMemoryAuditRepository::new()),
            Duration::from_secs(1),
        );
        let mut order = submitted("o1");
        order.cancel().unwrap();
        assert!(!monitor.track(&RunId::new("run"), order));
    }

    #[tokio::test(start_paused = true)]
    async fn background_loop_stops_on_cancel() {
        let mut broker = MockBroker::new();
        broker
            .expect_get_order_status()
            .returning(|_, _| Ok(update(OrderStatus::Filled, 100, Some(dec!(10000)))));
        let monitor = Arc::new(OrderMonitor::new(
            Arc::new(broker),
            Arc::new(InMemoryAuditRepository::new()),
            Duration::from_secs(1),
        ));
        monitor.track(&RunId::new("run"), submitted("o1"));

        let cancel = CancellationToken::new();
        let handle = Arc::clone(&monitor).spawn(Duration::from_millis(100), cancel.clone());
        tokio::time::sleep(Duration::from_millis(250)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(monitor.active_count(), 0);
    }
}
