//! End-to-end decision cycle tests.
//!
//! Drives the full pipeline from a market snapshot through signals,
//! ranking, portfolio construction, the risk gate and execution planning,
//! with the simulated broker standing in for the market.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use decision_engine::application::dto::{PipelineReport, RunPipelineRequest};
use decision_engine::application::ports::{AuditRepository, Broker, RequestContext};
use decision_engine::application::services::OrderMonitor;
use decision_engine::application::use_cases::RunPipelineUseCase;
use decision_engine::config::load_config_from_string;
use decision_engine::domain::order_execution::{OrderSide, OrderStatus};
use decision_engine::domain::shared::{InstrumentCode, StrategyId};
use decision_engine::error::{ErrorCode, PipelineError, Stage};
use decision_engine::infrastructure::broker::SimulatedBroker;
use decision_engine::infrastructure::container::decision_time;
use decision_engine::infrastructure::market_data::JsonSnapshotRepository;
use decision_engine::infrastructure::persistence::InMemoryAuditRepository;

use common::{CAPITAL, date, snapshot};

// =============================================================================
// Fixtures
// =============================================================================

/// Default 20-holding tier scheme with permissive screening.
fn yaml(mode: &str, strict: bool) -> String {
    format!(
        r"
strategy:
  id: kr-scenario
screening:
  min_momentum: -100
  min_technical: -100
  min_flow: -100
portfolio:
  strict_candidate_count: {strict}
risk_gate:
  mode: {mode}
"
    )
}

type UseCase = RunPipelineUseCase<SimulatedBroker, InMemoryAuditRepository>;

fn use_case(
    mode: &str,
    strict: bool,
    data: &Arc<JsonSnapshotRepository>,
) -> (UseCase, Arc<InMemoryAuditRepository>, Arc<SimulatedBroker>) {
    let document = load_config_from_string(&yaml(mode, strict)).unwrap();
    let audit = Arc::new(InMemoryAuditRepository::new());
    let mut broker = SimulatedBroker::new(CAPITAL, decision_time(date()));
    for (code, price) in data.portfolio_context(date()).prices {
        broker = broker.with_price(code, price);
    }
    let broker = Arc::new(broker);
    let use_case = RunPipelineUseCase::new(
        document,
        data.clone(),
        data.clone(),
        Arc::clone(&audit),
        Arc::clone(&broker),
    )
    .unwrap();
    (use_case, audit, broker)
}

fn request(data: &JsonSnapshotRepository, submit: bool) -> RunPipelineRequest {
    RunPipelineRequest {
        decided_at: decision_time(date()),
        context: data.portfolio_context(date()),
        submit,
    }
}

async fn run(mode: &str, strict: bool) -> Result<PipelineReport, PipelineError> {
    let data = snapshot();
    let (use_case, _, _) = use_case(mode, strict, &data);
    use_case
        .execute(request(&data, false), &CancellationToken::new())
        .await
}

// =============================================================================
// Scenario
// =============================================================================

#[tokio::test]
async fn strongest_instrument_ranks_first() {
    let report = run("SHADOW", false).await.unwrap();

    assert_eq!(report.universe_size, 3);
    assert_eq!(report.signal_count, 3);
    assert_eq!(report.data_snapshot_id, "krx-20250630");

    let ranks: Vec<(&str, usize)> = report
        .ranked
        .iter()
        .map(|r| (r.code.as_str(), r.rank))
        .collect();
    assert_eq!(ranks[0], ("A", 1));
    assert_eq!(report.ranked.len(), 3);
    assert!(
        report
            .ranked
            .windows(2)
            .all(|w| w[0].total_score >= w[1].total_score)
    );
}

#[tokio::test]
async fn short_candidate_list_keeps_unfilled_slots_in_cash() {
    let report = run("SHADOW", false).await.unwrap();

    let held: Vec<_> = report.portfolio.held().collect();
    assert_eq!(held.len(), 3);
    for position in &held {
        assert!((position.weight - 0.07).abs() < 1e-9, "{position:?}");
    }
    assert!((report.portfolio.cash_weight - 0.79).abs() < 1e-9);

    assert_eq!(report.orders.len(), 3);
    assert!(report.fully_planned());
    assert!(report.orders.iter().all(|o| o.side() == OrderSide::Buy));
    assert!(report.orders.iter().all(|o| o.status() == OrderStatus::Pending));
}

#[tokio::test]
async fn strict_candidate_count_fails_the_cycle() {
    let err = run("SHADOW", true).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientCandidates);
    assert_eq!(err.stage(), Stage::Portfolio);
}

// =============================================================================
// Determinism
// =============================================================================

#[tokio::test]
async fn reruns_produce_identical_reports() {
    let first = serde_json::to_value(run("SHADOW", false).await.unwrap()).unwrap();
    let second = serde_json::to_value(run("SHADOW", false).await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn rerun_against_same_audit_trail_is_idempotent() {
    let data = snapshot();
    let (use_case, audit, _) = use_case("SHADOW", false, &data);
    let cancel = CancellationToken::new();

    let first = use_case.execute(request(&data, false), &cancel).await.unwrap();
    let second = use_case.execute(request(&data, false), &cancel).await.unwrap();

    assert_eq!(first.run_id, second.run_id);
    assert_eq!(audit.snapshot_count(), 1);
    let ids = |r: &PipelineReport| r.orders.iter().map(|o| o.id().clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(audit.risk_events(&first.run_id).await.unwrap().len(), 2);
}

// =============================================================================
// Risk gate modes
// =============================================================================

/// Tier weight of 0.07 breaches this single-name cap.
const TIGHT_LIMITS: &str = "  max_position_weight: 0.05\n";

#[tokio::test]
async fn shadow_records_what_enforce_blocks() {
    let data = snapshot();
    for (mode, expect_block) in [("SHADOW", false), ("ENFORCE", true)] {
        let document =
            load_config_from_string(&format!("{}{TIGHT_LIMITS}", yaml(mode, false))).unwrap();
        let audit = Arc::new(InMemoryAuditRepository::new());
        let use_case = RunPipelineUseCase::new(
            document,
            data.clone(),
            data.clone(),
            Arc::clone(&audit),
            Arc::new(SimulatedBroker::new(CAPITAL, decision_time(date()))),
        )
        .unwrap();

        let outcome = use_case
            .execute(request(&data, false), &CancellationToken::new())
            .await;

        let snapshot = audit
            .find_snapshot(&StrategyId::new("kr-scenario"), date())
            .await
            .unwrap()
            .unwrap();
        let events = audit.risk_events(&snapshot.run_id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].would_block, "{mode}");

        if expect_block {
            let err = outcome.unwrap_err();
            assert_eq!(err.code(), ErrorCode::RiskLimitExceeded);
        } else {
            let report = outcome.unwrap();
            assert!(report.risk_gate.passed);
            assert_eq!(report.orders.len(), 3);
        }
    }
}

// =============================================================================
// Submission and monitoring
// =============================================================================

#[tokio::test]
async fn submitted_orders_fill_and_record_slippage() {
    let data = snapshot();
    let (use_case, audit, broker) = use_case("SHADOW", false, &data);
    let monitor = Arc::new(OrderMonitor::new(
        Arc::clone(&broker),
        Arc::clone(&audit),
        std::time::Duration::from_secs(1),
    ));
    let use_case = use_case.with_monitor(Arc::clone(&monitor));
    let cancel = CancellationToken::new();

    let report = use_case.execute(request(&data, true), &cancel).await.unwrap();
    let summary = report.submission.unwrap();
    assert_eq!(summary.submitted, 3);
    assert_eq!(summary.rejected, 0);
    assert_eq!(monitor.active_count(), 3);

    let tick = monitor.poll_once(&cancel).await;
    assert_eq!(tick.completed, 3);
    assert_eq!(monitor.active_count(), 0);

    let filled = monitor.drain_completed();
    assert!(filled.iter().all(|o| o.status() == OrderStatus::Filled));
    let records = audit.slippage_records(&report.run_id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.slippage_bps.abs() < 1e-6));

    let a = InstrumentCode::new("A");
    let holding = broker
        .get_holdings(&RequestContext::new(std::time::Duration::from_secs(1)))
        .await
        .unwrap()
        .into_iter()
        .find(|h| h.code == a)
        .unwrap();
    assert!(holding.quantity > 0);
}
