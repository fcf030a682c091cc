//! Container wiring tests against the shipped example configuration.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used)]

mod common;

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use decision_engine::application::dto::RunPipelineRequest;
use decision_engine::config::{BrokerKind, load_config};
use decision_engine::domain::risk_management::RiskGateMode;
use decision_engine::error::ErrorCode;
use decision_engine::infrastructure::container::{Container, decision_time};

use common::{date, snapshot_json};

fn example_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml")
}

#[test]
fn example_config_loads_with_defaults() {
    let document = load_config(example_config()).unwrap();
    let config = &document.config;

    assert_eq!(config.strategy.id.as_str(), "kr-multifactor");
    assert_eq!(config.broker.kind, BrokerKind::Simulated);
    assert_eq!(config.risk_gate.mode, RiskGateMode::Shadow);
    assert_eq!(config.portfolio.target_holdings, 20);
    assert!(config.observability.metrics.listen_addr.is_none());
    assert_eq!(document.hash.len(), 64);
}

#[tokio::test]
async fn container_runs_cycle_with_file_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("snapshot.json");
    std::fs::write(&data_path, snapshot_json()).unwrap();
    let audit_dir = dir.path().join("audit");

    let document = load_config(example_config()).unwrap();
    let container = Container::build(document, &data_path, Some(&audit_dir), date())
        .await
        .unwrap();
    let use_case = container
        .run_pipeline_use_case()
        .unwrap()
        .with_monitor(container.order_monitor());

    let report = use_case
        .execute(
            RunPipelineRequest {
                decided_at: decision_time(date()),
                context: container.portfolio_context(),
                submit: false,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.ranked[0].code.as_str(), "A");
    assert!(report.submission.is_none());

    let snapshots = std::fs::read_to_string(audit_dir.join("snapshots.jsonl")).unwrap();
    assert_eq!(snapshots.lines().count(), 1);
    assert!(snapshots.contains(report.run_id.as_str()));
    let events = std::fs::read_to_string(audit_dir.join("risk_events.jsonl")).unwrap();
    assert_eq!(events.lines().count(), 1);
}

#[tokio::test]
async fn missing_snapshot_fails_the_quality_gate() {
    let dir = tempfile::tempdir().unwrap();
    let document = load_config(example_config()).unwrap();

    let err = Container::build(document, &dir.path().join("absent.json"), None, date())
        .await
        .err()
        .unwrap();

    assert_eq!(err.code(), ErrorCode::QualityGateFailed);
}
