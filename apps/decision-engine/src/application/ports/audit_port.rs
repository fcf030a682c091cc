//! Audit Repository Port (Driven Port)
//!
//! Append-only storage of decision snapshots, risk gate events and realized
//! slippage.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{Order, OrderSide};
use crate::domain::risk_management::RiskGateEvent;
use crate::domain::shared::{InstrumentCode, OrderId, RunId, StrategyId};
use crate::domain::snapshot::DecisionSnapshot;

/// Realized execution cost of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippageRecord {
    /// Decision cycle.
    pub run_id: RunId,
    /// Order.
    pub order_id: OrderId,
    /// Instrument.
    pub code: InstrumentCode,
    /// Side.
    pub side: OrderSide,
    /// Price the plan was computed from.
    pub planned_price: Decimal,
    /// Average executed price.
    pub executed_price: Decimal,
    /// Shares filled.
    pub filled_quantity: u64,
    /// Side-adjusted slippage; positive is a cost.
    pub slippage_bps: f64,
    /// Slippage assumed at planning, in bps.
    pub expected_bps: f64,
    /// When the fill was observed.
    pub recorded_at: DateTime<Utc>,
}

impl SlippageRecord {
    /// Build a record from a filled order. `None` if nothing was filled.
    #[must_use]
    pub fn from_order(run_id: &RunId, order: &Order, recorded_at: DateTime<Utc>) -> Option<Self> {
        let executed_price = order.avg_fill_price()?;
        let slippage_bps = order.realized_slippage_bps()?;
        (order.filled_quantity() > 0).then(|| Self {
            run_id: run_id.clone(),
            order_id: order.id().clone(),
            code: order.code().clone(),
            side: order.side(),
            planned_price: order.reference_price(),
            executed_price,
            filled_quantity: order.filled_quantity(),
            slippage_bps,
            expected_bps: order.expected_slippage_pct() * 10_000.0,
            recorded_at,
        })
    }
}

/// Audit storage error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Underlying storage failed.
    #[error("audit storage error: {message}")]
    Storage {
        /// Error details.
        message: String,
    },

    /// A snapshot with different content already exists for the key.
    #[error("conflicting decision snapshot for {strategy_id} on {date}")]
    SnapshotConflict {
        /// Strategy.
        strategy_id: StrategyId,
        /// Decision date.
        date: NaiveDate,
    },

    /// Record could not be encoded or decoded.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Port for audit persistence.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Store the snapshot, keyed by strategy id and decision date.
    ///
    /// Saving an identical snapshot twice is a no-op.
    async fn save_snapshot(&self, snapshot: &DecisionSnapshot) -> Result<(), AuditError>;

    /// Snapshot for a strategy and date.
    async fn find_snapshot(
        &self,
        strategy_id: &StrategyId,
        date: NaiveDate,
    ) -> Result<Option<DecisionSnapshot>, AuditError>;

    /// Append a risk gate event.
    async fn save_risk_event(&self, event: &RiskGateEvent) -> Result<(), AuditError>;

    /// Risk gate events of a run, in insertion order.
    async fn risk_events(&self, run_id: &RunId) -> Result<Vec<RiskGateEvent>, AuditError>;

    /// Append a slippage record.
    async fn save_slippage(&self, record: &SlippageRecord) -> Result<(), AuditError>;

    /// Slippage records of a run, in insertion order.
    async fn slippage_records(&self, run_id: &RunId) -> Result<Vec<SlippageRecord>, AuditError>;
}
