//! Pipeline request and report DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::application::services::SubmissionReport;
use crate::domain::execution_planning::PlanRejection;
use crate::domain::order_execution::Order;
use crate::domain::portfolio::{PortfolioContext, TargetPortfolio};
use crate::domain::risk_management::RiskGateEvent;
use crate::domain::selection::RankedStock;
use crate::domain::shared::{InstrumentCode, RunId, StrategyId};
use crate::domain::signals::SignalWarning;

/// Input of one decision cycle.
#[derive(Debug, Clone)]
pub struct RunPipelineRequest {
    /// Decision time. The decision date and every order timestamp derive
    /// from it.
    pub decided_at: DateTime<Utc>,
    /// Capital, holdings, prices and liquidity as of the decision.
    pub context: PortfolioContext,
    /// Whether planned orders are sent to the broker.
    pub submit: bool,
}

/// Counts of a submission batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionSummary {
    /// Accepted by the broker.
    pub submitted: usize,
    /// Rejected.
    pub rejected: usize,
    /// Outcome unknown, flagged for reconciliation.
    pub needs_reconciliation: usize,
    /// Never sent.
    pub not_sent: usize,
}

impl From<&SubmissionReport> for SubmissionSummary {
    fn from(report: &SubmissionReport) -> Self {
        Self {
            submitted: report.submitted,
            rejected: report.rejected,
            needs_reconciliation: report.needs_reconciliation,
            not_sent: report.not_sent,
        }
    }
}

/// Everything a decision cycle produced, in stage order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Deterministic run identifier.
    pub run_id: RunId,
    /// Strategy.
    pub strategy_id: StrategyId,
    /// Canonical configuration hash.
    pub config_hash: String,
    /// Decision date.
    pub decision_date: NaiveDate,
    /// Upstream data snapshot.
    pub data_snapshot_id: String,
    /// Instruments in the verified universe.
    pub universe_size: usize,
    /// Instruments with signals.
    pub signal_count: usize,
    /// Neutral fallbacks.
    pub signal_warnings: Vec<SignalWarning>,
    /// Codes that passed screening.
    pub candidates: Vec<InstrumentCode>,
    /// Ranked candidates.
    pub ranked: Vec<RankedStock>,
    /// Target portfolio.
    pub portfolio: TargetPortfolio,
    /// Risk gate verdict.
    pub risk_gate: RiskGateEvent,
    /// Planned orders, post-submission state when submitted.
    pub orders: Vec<Order>,
    /// Positions that produced no order.
    pub rejections: Vec<PlanRejection>,
    /// Submission outcome, absent for dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionSummary>,
}

impl PipelineReport {
    /// Whether every target position produced an order.
    #[must_use]
    pub fn fully_planned(&self) -> bool {
        self.rejections.is_empty()
    }

    /// Rejections for one instrument.
    pub fn rejections_for<'a>(
        &'a self,
        code: &'a InstrumentCode,
    ) -> impl Iterator<Item = &'a PlanRejection> + 'a {
        self.rejections.iter().filter(move |r| &r.code == code)
    }
}
