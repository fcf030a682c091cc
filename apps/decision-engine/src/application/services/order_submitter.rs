//! Order Submitter Service
//!
//! Submits planned orders under a requests-per-second budget shared by all
//! orders. Instruments proceed concurrently up to `max_in_flight`; slices
//! of one instrument go out in schedule order, each held back by its offset
//! from the moment the batch started.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::ports::{Broker, BrokerError, RequestContext, SubmitOrderRequest};
use crate::config::BrokerConfig;
use crate::domain::order_execution::{Order, OrderStatus};
use crate::domain::shared::InstrumentCode;
use crate::observability::record_submission;

/// Spaces requests evenly at a fixed rate.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// Limiter allowing `per_second` requests per second.
    #[must_use]
    pub fn new(per_second: f64) -> Self {
        let interval = if per_second.is_finite() && per_second > 0.0 {
            Duration::from_secs_f64(1.0 / per_second)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait for the next free slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Outcome of a submission batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionReport {
    /// Orders accepted by the broker.
    pub submitted: usize,
    /// Orders rejected by the broker or failed permanently.
    pub rejected: usize,
    /// Orders whose submission outcome is unknown.
    pub needs_reconciliation: usize,
    /// Orders not sent because the batch was cancelled.
    pub not_sent: usize,
    /// All orders in their post-submission state, in input order.
    pub orders: Vec<Order>,
}

/// Submits orders to a [`Broker`].
pub struct OrderSubmitter<B: Broker + ?Sized> {
    broker: Arc<B>,
    limiter: Arc<RateLimiter>,
    max_in_flight: usize,
    request_timeout: Duration,
}

impl<B: Broker + ?Sized> OrderSubmitter<B> {
    /// Create a submitter from broker settings.
    #[must_use]
    pub fn new(broker: Arc<B>, config: &BrokerConfig) -> Self {
        Self {
            broker,
            limiter: Arc::new(RateLimiter::new(config.requests_per_second)),
            max_in_flight: config.max_in_flight.max(1),
            request_timeout: config.request_timeout(),
        }
    }

    /// Submit every order. Never fails as a whole; per-order outcomes are
    /// recorded on the orders and summarized in the report.
    pub async fn submit_all(&self, orders: Vec<Order>, cancel: &CancellationToken) -> SubmissionReport {
        let total = orders.len();
        let batch_start = Instant::now();
        let mut groups: BTreeMap<InstrumentCode, Vec<(usize, Order)>> = BTreeMap::new();
        for (index, order) in orders.into_iter().enumerate() {
            groups.entry(order.code().clone()).or_default().push((index, order));
        }

        let results: Vec<Vec<(usize, Order)>> = stream::iter(groups.into_values())
            .map(|group| self.submit_group(group, batch_start, cancel))
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut indexed: Vec<(usize, Order)> = results.into_iter().flatten().collect();
        indexed.sort_by_key(|(index, _)| *index);

        let mut report = SubmissionReport::default();
        for (_, order) in indexed {
            match order.status() {
                OrderStatus::Rejected => report.rejected += 1,
                OrderStatus::Pending if order.needs_reconciliation() => {
                    report.needs_reconciliation += 1;
                }
                OrderStatus::Pending => report.not_sent += 1,
                _ => report.submitted += 1,
            }
            report.orders.push(order);
        }

        record_submission(report.submitted, report.rejected);
        info!(
            total,
            submitted = report.submitted,
            rejected = report.rejected,
            needs_reconciliation = report.needs_reconciliation,
            not_sent = report.not_sent,
            "Order submission complete"
        );
        report
    }

    async fn submit_group(
        &self,
        group: Vec<(usize, Order)>,
        batch_start: Instant,
        cancel: &CancellationToken,
    ) -> Vec<(usize, Order)> {
        let mut out = Vec::with_capacity(group.len());
        for (index, mut order) in group {
            if !cancel.is_cancelled() {
                self.submit_one(&mut order, batch_start, cancel).await;
            }
            out.push((index, order));
        }
        out
    }

    async fn submit_one(&self, order: &mut Order, batch_start: Instant, cancel: &CancellationToken) {
        let delay = order.submission_delay();
        if !delay.is_zero() {
            debug!(
                order_id = %order.id(),
                offset_secs = delay.as_secs(),
                scheduled_at = %order.scheduled_at(),
                "Waiting for slice slot"
            );
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep_until(batch_start + delay) => {}
            }
        }

        tokio::select! {
            () = cancel.cancelled() => return,
            () = self.limiter.acquire() => {}
        }

        let request = SubmitOrderRequest::from_order(order);
        let ctx = RequestContext::child_of(self.request_timeout, cancel);

        match self.broker.submit_order(&request, &ctx).await {
            Ok(ack) => {
                let outcome = if ack.status == OrderStatus::Rejected {
                    order.reject("rejected at acknowledgment")
                } else {
                    order.mark_submitted(ack.broker_order_id)
                };
                if let Err(err) = outcome {
                    warn!(order_id = %order.id(), error = %err, "Unexpected acknowledgment state");
                }
            }
            Err(BrokerError::Cancelled) => {
                debug!(order_id = %order.id(), "Submission cancelled");
            }
            Err(err) if err.is_ambiguous() && !self.broker.supports_idempotent_submission() => {
                warn!(
                    order_id = %order.id(),
                    error = %err,
                    "Submission outcome unknown, flagged for manual reconciliation"
                );
                order.flag_for_reconciliation();
            }
            Err(err) => {
                warn!(order_id = %order.id(), error = %err, "Order submission failed");
                if let Err(transition) = order.reject(err.to_string()) {
                    warn!(order_id = %order.id(), error = %transition, "Could not mark order rejected");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex as SyncMutex;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::{MockBroker, OrderAck};
    use crate::config::SplittingConfig;
    use crate::domain::execution_planning::OrderSplitter;
    use crate::domain::order_execution::{CreateOrderCommand, OrderSide, OrderType};
    use crate::domain::shared::{BrokerId, OrderId};

    fn command(id: &str, code: &str) -> CreateOrderCommand {
        CreateOrderCommand {
            id: OrderId::new(id),
            code: InstrumentCode::new(code),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: 10,
            price: Some(dec!(50100)),
            reference_price: dec!(50000),
            expected_slippage_pct: 0.001,
            created_at: Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
            slice: None,
        }
    }

    fn order(id: &str, code: &str) -> Order {
        Order::new(command(id, code)).unwrap()
    }

    fn config() -> BrokerConfig {
        BrokerConfig {
            requests_per_second: 1000.0,
            ..BrokerConfig::default()
        }
    }

    #[tokio::test]
    async fn accepted_orders_are_submitted() {
        let mut broker = MockBroker::new();
        broker.expect_submit_order().times(2).returning(|request, _| {
            Ok(OrderAck {
                broker_order_id: BrokerId::new(format!("bk-{}", request.client_order_id)),
                client_order_id: request.client_order_id.clone(),
                status: OrderStatus::Submitted,
            })
        });

        let submitter = OrderSubmitter::new(Arc::new(broker), &config());
        let report = submitter
            .submit_all(vec![order("o1", "A"), order("o2", "B")], &CancellationToken::new())
            .await;

        assert_eq!(report.submitted, 2);
        assert_eq!(report.orders[0].id().as_str(), "o1");
        assert_eq!(report.orders[0].status(), OrderStatus::Submitted);
        assert_eq!(
            report.orders[1].broker_order_id().map(BrokerId::as_str),
            Some("bk-o2")
        );
    }

    #[tokio::test]
    async fn broker_rejection_rejects_order() {
        let mut broker = MockBroker::new();
        broker.expect_submit_order().returning(|_, _| {
            Err(BrokerError::OrderRejected {
                reason: "outside price band".to_string(),
            })
        });
        broker.expect_supports_idempotent_submission().return_const(false);

        let submitter = OrderSubmitter::new(Arc::new(broker), &config());
        let report = submitter
            .submit_all(vec![order("o1", "A")], &CancellationToken::new())
            .await;

        assert_eq!(report.rejected, 1);
        assert!(report.orders[0].reject_reason().unwrap().contains("price band"));
    }

    #[tokio::test]
    async fn ambiguous_failure_flags_reconciliation() {
        let mut broker = MockBroker::new();
        broker
            .expect_submit_order()
            .returning(|_, _| Err(BrokerError::Timeout { timeout_ms: 5000 }));
        broker.expect_supports_idempotent_submission().return_const(false);

        let submitter = OrderSubmitter::new(Arc::new(broker), &config());
        let report = submitter
            .submit_all(vec![order("o1", "A")], &CancellationToken::new())
            .await;

        assert_eq!(report.needs_reconciliation, 1);
        assert!(report.orders[0].needs_reconciliation());
        assert_eq!(report.orders[0].status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn cancelled_batch_sends_nothing() {
        let mut broker = MockBroker::new();
        broker.expect_submit_order().never();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let submitter = OrderSubmitter::new(Arc::new(broker), &config());
        let report = submitter.submit_all(vec![order("o1", "A")], &cancel).await;

        assert_eq!(report.not_sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slices_keep_their_spacing_when_decision_time_has_passed() {
        let parent = CreateOrderCommand {
            quantity: 3000,
            created_at: Utc.with_ymd_and_hms(2025, 6, 29, 23, 0, 0).unwrap(),
            ..command("run-B-A", "A")
        };
        let splitter = OrderSplitter::new(SplittingConfig {
            interval_secs: 300,
            ..SplittingConfig::default()
        });
        let slices: Vec<Order> = splitter
            .split(parent, Some(dec!(2000000000)))
            .into_iter()
            .map(|cmd| Order::new(cmd).unwrap())
            .collect();
        assert_eq!(slices.len(), 4);

        let sent_at = Arc::new(SyncMutex::new(Vec::new()));
        let recorder = Arc::clone(&sent_at);
        let start = Instant::now();
        let mut broker = MockBroker::new();
        broker.expect_submit_order().times(4).returning(move |request, _| {
            recorder.lock().push(start.elapsed());
            Ok(OrderAck {
                broker_order_id: BrokerId::new(format!("bk-{}", request.client_order_id)),
                client_order_id: request.client_order_id.clone(),
                status: OrderStatus::Submitted,
            })
        });

        let submitter = OrderSubmitter::new(Arc::new(broker), &config());
        let report = submitter.submit_all(slices, &CancellationToken::new()).await;

        assert_eq!(report.submitted, 4);
        let sent_at = sent_at.lock();
        for (i, elapsed) in sent_at.iter().enumerate() {
            assert!(*elapsed >= Duration::from_secs(300 * i as u64), "slice {i} sent at {elapsed:?}");
        }
        assert!(start.elapsed() >= Duration::from_secs(900));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(10.0);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
