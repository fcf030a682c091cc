//! Run Pipeline Use Case
//!
//! One decision cycle: snapshot, universe verification, signals, screening,
//! ranking, portfolio construction, risk gate, execution planning and
//! optional submission. Stages run in order; the first stage failure halts
//! the cycle and nothing later runs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::dto::{PipelineReport, RunPipelineRequest, SubmissionSummary};
use crate::application::ports::{AuditRepository, Broker, UniverseProvider, verify_universe};
use crate::application::services::{OrderMonitor, OrderSubmitter};
use crate::config::ConfigDocument;
use crate::domain::execution_planning::ExecutionPlanner;
use crate::domain::portfolio::{PortfolioConstructor, TargetPortfolio};
use crate::domain::risk_management::{RiskGate, RiskGateEvent, RiskGateViolation, RiskModel};
use crate::domain::selection::{Ranker, Screener};
use crate::domain::shared::{InstrumentCode, RunId};
use crate::domain::signals::{InstrumentDataRepository, SignalEngine};
use crate::domain::snapshot::DecisionSnapshot;
use crate::error::PipelineError;
use crate::observability::record_pipeline_run;

/// Runs decision cycles against one configuration.
pub struct RunPipelineUseCase<B, A>
where
    B: Broker + ?Sized,
    A: AuditRepository + ?Sized,
{
    document: ConfigDocument,
    engine: Arc<SignalEngine>,
    data: Arc<dyn InstrumentDataRepository>,
    universe: Arc<dyn UniverseProvider>,
    audit: Arc<A>,
    broker: Arc<B>,
    monitor: Option<Arc<OrderMonitor<B, A>>>,
}

impl<B, A> RunPipelineUseCase<B, A>
where
    B: Broker + ?Sized + 'static,
    A: AuditRepository + ?Sized + 'static,
{
    /// Create the use case.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal worker pool cannot be created.
    pub fn new(
        document: ConfigDocument,
        data: Arc<dyn InstrumentDataRepository>,
        universe: Arc<dyn UniverseProvider>,
        audit: Arc<A>,
        broker: Arc<B>,
    ) -> Result<Self, PipelineError> {
        let engine = SignalEngine::new(&document.config.signals)?;
        Ok(Self {
            document,
            engine: Arc::new(engine),
            data,
            universe,
            audit,
            broker,
            monitor: None,
        })
    }

    /// Hand submitted orders to `monitor`.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<OrderMonitor<B, A>>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Configuration in use.
    pub const fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Execute one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure: audit storage, quality gate,
    /// strict portfolio construction, an ENFORCE-mode risk block or a risk
    /// gate timeout.
    pub async fn execute(
        &self,
        request: RunPipelineRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let config = &self.document.config;
        let date = request.decided_at.date_naive();

        let universe = self.universe.universe(date)?;
        let snapshot = DecisionSnapshot::new(
            &self.document,
            universe.snapshot_id.clone(),
            request.decided_at,
        );
        let run_id = snapshot.run_id.clone();
        self.audit.save_snapshot(&snapshot).await?;
        info!(
            run_id = %run_id,
            config_hash = %snapshot.config_hash,
            data_snapshot_id = %snapshot.data_snapshot_id,
            "Decision snapshot recorded"
        );

        verify_universe(&universe, date)?;
        let universe_size = universe.len();
        info!(run_id = %run_id, stage = "universe", instruments = universe_size, "Universe verified");

        let engine = Arc::clone(&self.engine);
        let data = Arc::clone(&self.data);
        let decided_at = request.decided_at;
        let build = tokio::task::spawn_blocking(move || engine.build(&universe, data.as_ref(), decided_at))
            .await
            .map_err(|e| PipelineError::Internal {
                message: format!("signal build task failed: {e}"),
            })?;
        info!(
            run_id = %run_id,
            stage = "signals",
            signals = build.signal_set.len(),
            warnings = build.warnings.len(),
            "Signals built"
        );

        let candidates = Screener::new(config.screening.clone()).screen(&build.signal_set);
        let ranked = Ranker::new(config.ranking.weights).rank(&candidates, &build.signal_set);
        info!(
            run_id = %run_id,
            stage = "selection",
            candidates = candidates.len(),
            ranked = ranked.len(),
            "Candidates ranked"
        );

        let portfolio = PortfolioConstructor::new(config.portfolio.clone()).construct(
            &ranked,
            &request.context,
            date,
        )?;
        info!(
            run_id = %run_id,
            stage = "portfolio",
            positions = portfolio.held().count(),
            cash_weight = portfolio.cash_weight,
            "Target portfolio constructed"
        );

        let risk_event = self.check_risk(&portfolio, &run_id).await?;
        self.audit.save_risk_event(&risk_event).await?;
        if risk_event.blocks() {
            return Err(RiskGateViolation {
                run_id,
                violation_count: risk_event.violation_count,
                message: risk_event.message,
            }
            .into());
        }

        let plan = ExecutionPlanner::new(config.execution.clone()).plan(
            &portfolio,
            &request.context,
            &snapshot,
        );

        let (orders, submission) = if request.submit && !plan.orders.is_empty() {
            let submitter = OrderSubmitter::new(Arc::clone(&self.broker), &config.broker);
            let report = submitter.submit_all(plan.orders, cancel).await;
            if let Some(monitor) = &self.monitor {
                let tracked = report
                    .orders
                    .iter()
                    .filter(|order| monitor.track(&run_id, (*order).clone()))
                    .count();
                debug!(run_id = %run_id, tracked, "Orders handed to monitor");
            }
            let summary = SubmissionSummary::from(&report);
            (report.orders, Some(summary))
        } else {
            (plan.orders, None)
        };

        record_pipeline_run("completed");
        info!(
            run_id = %run_id,
            orders = orders.len(),
            rejections = plan.rejections.len(),
            submitted = submission.map_or(0, |s| s.submitted),
            "Decision cycle complete"
        );

        Ok(PipelineReport {
            run_id,
            strategy_id: snapshot.strategy_id,
            config_hash: snapshot.config_hash,
            decision_date: date,
            data_snapshot_id: snapshot.data_snapshot_id,
            universe_size,
            signal_count: build.signal_set.len(),
            signal_warnings: build.warnings,
            candidates,
            ranked,
            portfolio,
            risk_gate: risk_event,
            orders,
            rejections: plan.rejections,
            submission,
        })
    }

    /// Run the risk gate off the async runtime under its deadline.
    async fn check_risk(
        &self,
        portfolio: &TargetPortfolio,
        run_id: &RunId,
    ) -> Result<RiskGateEvent, PipelineError> {
        let risk_config = self.document.config.risk_gate.clone();
        let timeout_ms = risk_config.timeout_ms;
        let model = self.risk_model(portfolio);
        let gate = RiskGate::new(risk_config);
        let portfolio = portfolio.clone();
        let task_run_id = run_id.clone();

        let task = tokio::task::spawn_blocking(move || gate.check(&portfolio, &model, &task_run_id));
        match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(join)) => Err(PipelineError::Internal {
                message: format!("risk gate task failed: {join}"),
            }),
            Err(_) => {
                warn!(run_id = %run_id, timeout_ms, "Risk gate timed out");
                record_pipeline_run("risk_timeout");
                Err(PipelineError::RiskGateTimeout { timeout_ms })
            }
        }
    }

    /// Volatility model over the portfolio's holdings. Instruments whose
    /// history cannot be read fall back to the default volatility.
    fn risk_model(&self, portfolio: &TargetPortfolio) -> RiskModel {
        let risk = &self.document.config.risk_gate;
        let mut closes: BTreeMap<InstrumentCode, Vec<f64>> = BTreeMap::new();
        for position in portfolio.held() {
            match self
                .data
                .daily_bars(&position.code, portfolio.date, risk.lookback_days + 1)
            {
                Ok(bars) => {
                    closes.insert(
                        position.code.clone(),
                        bars.iter().map(|bar| bar.close).collect(),
                    );
                }
                Err(err) => {
                    warn!(code = %position.code, error = %err, "Price history unavailable for risk model");
                }
            }
        }
        RiskModel::from_history(&closes, risk)
    }
}
