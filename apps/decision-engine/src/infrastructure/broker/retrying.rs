//! Retry decorator for any [`Broker`].
//!
//! Reads are always retried on retryable errors. Submit and cancel are
//! retried only when the inner broker deduplicates them; otherwise the
//! first error is surfaced so the caller can flag the order.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::retry::{BrokerRetryPolicy, ExponentialBackoffCalculator};
use crate::application::ports::{
    AccountBalance, Broker, BrokerError, OrderAck, RequestContext, SubmitOrderRequest,
};
use crate::domain::order_execution::OrderUpdate;
use crate::domain::portfolio::Holding;
use crate::domain::shared::{BrokerId, InstrumentCode};
use crate::observability::record_broker_retry;

/// Broker wrapper applying a [`BrokerRetryPolicy`].
#[derive(Debug)]
pub struct RetryingBroker<B: Broker + ?Sized> {
    inner: Arc<B>,
    policy: BrokerRetryPolicy,
}

impl<B: Broker + ?Sized> RetryingBroker<B> {
    /// Wrap `inner`.
    #[must_use]
    pub const fn new(inner: Arc<B>, policy: BrokerRetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped broker.
    pub const fn inner(&self) -> &Arc<B> {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        repeatable: bool,
        ctx: &RequestContext,
        mut call: F,
    ) -> Result<T, BrokerError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, BrokerError>> + Send,
        T: Send,
    {
        let mut backoff = ExponentialBackoffCalculator::new(&self.policy);
        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !repeatable || !err.is_retryable() || ctx.cancel.is_cancelled() {
                return Err(err);
            }
            let Some(delay) = backoff.next_backoff() else {
                warn!(operation, attempts = backoff.current_attempt(), error = %err, "Broker retries exhausted");
                return Err(err);
            };

            debug!(
                operation,
                attempt = backoff.current_attempt(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying broker call"
            );
            record_broker_retry(operation);

            tokio::select! {
                () = ctx.cancel.cancelled() => return Err(BrokerError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[async_trait]
impl<B: Broker + ?Sized> Broker for RetryingBroker<B> {
    async fn submit_order(
        &self,
        request: &SubmitOrderRequest,
        ctx: &RequestContext,
    ) -> Result<OrderAck, BrokerError> {
        let inner = self.inner.as_ref();
        let repeatable = inner.supports_idempotent_submission();
        self.with_retry("submit_order", repeatable, ctx, || inner.submit_order(request, ctx))
            .await
    }

    async fn cancel_order(
        &self,
        broker_order_id: &BrokerId,
        ctx: &RequestContext,
    ) -> Result<(), BrokerError> {
        let inner = self.inner.as_ref();
        let repeatable = inner.supports_idempotent_submission();
        self.with_retry("cancel_order", repeatable, ctx, || {
            inner.cancel_order(broker_order_id, ctx)
        })
        .await
    }

    async fn get_order_status(
        &self,
        broker_order_id: &BrokerId,
        ctx: &RequestContext,
    ) -> Result<OrderUpdate, BrokerError> {
        let inner = self.inner.as_ref();
        self.with_retry("get_order_status", true, ctx, || {
            inner.get_order_status(broker_order_id, ctx)
        })
        .await
    }

    async fn get_current_price(
        &self,
        code: &InstrumentCode,
        ctx: &RequestContext,
    ) -> Result<Decimal, BrokerError> {
        let inner = self.inner.as_ref();
        self.with_retry("get_current_price", true, ctx, || {
            inner.get_current_price(code, ctx)
        })
        .await
    }

    async fn get_balance(&self, ctx: &RequestContext) -> Result<AccountBalance, BrokerError> {
        let inner = self.inner.as_ref();
        self.with_retry("get_balance", true, ctx, || inner.get_balance(ctx))
            .await
    }

    async fn get_holdings(&self, ctx: &RequestContext) -> Result<Vec<Holding>, BrokerError> {
        let inner = self.inner.as_ref();
        self.with_retry("get_holdings", true, ctx, || inner.get_holdings(ctx))
            .await
    }

    fn supports_idempotent_submission(&self) -> bool {
        self.inner.supports_idempotent_submission()
    }
}
