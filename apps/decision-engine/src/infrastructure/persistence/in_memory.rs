//! In-memory audit repository for tests and dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::application::ports::{AuditError, AuditRepository, SlippageRecord};
use crate::domain::risk_management::RiskGateEvent;
use crate::domain::shared::{RunId, StrategyId};
use crate::domain::snapshot::DecisionSnapshot;

#[derive(Debug, Default)]
struct Records {
    snapshots: BTreeMap<(StrategyId, NaiveDate), DecisionSnapshot>,
    risk_events: Vec<RiskGateEvent>,
    slippage: Vec<SlippageRecord>,
}

/// In-memory implementation of `AuditRepository`.
///
/// Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    records: RwLock<Records>,
}

impl InMemoryAuditRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.records.read().snapshots.len()
    }
}

/// Shared keyed-insert rule: identical is a no-op, different is a conflict.
pub(super) fn check_snapshot(
    existing: Option<&DecisionSnapshot>,
    snapshot: &DecisionSnapshot,
) -> Result<bool, AuditError> {
    match existing {
        None => Ok(true),
        Some(stored) if stored == snapshot => Ok(false),
        Some(_) => Err(AuditError::SnapshotConflict {
            strategy_id: snapshot.strategy_id.clone(),
            date: snapshot.decision_date,
        }),
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn save_snapshot(&self, snapshot: &DecisionSnapshot) -> Result<(), AuditError> {
        let mut records = self.records.write();
        let key = (snapshot.strategy_id.clone(), snapshot.decision_date);
        if check_snapshot(records.snapshots.get(&key), snapshot)? {
            records.snapshots.insert(key, snapshot.clone());
        }
        Ok(())
    }

    async fn find_snapshot(
        &self,
        strategy_id: &StrategyId,
        date: NaiveDate,
    ) -> Result<Option<DecisionSnapshot>, AuditError> {
        Ok(self
            .records
            .read()
            .snapshots
            .get(&(strategy_id.clone(), date))
            .cloned())
    }

    async fn save_risk_event(&self, event: &RiskGateEvent) -> Result<(), AuditError> {
        self.records.write().risk_events.push(event.clone());
        Ok(())
    }

    async fn risk_events(&self, run_id: &RunId) -> Result<Vec<RiskGateEvent>, AuditError> {
        Ok(self
            .records
            .read()
            .risk_events
            .iter()
            .filter(|event| &event.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn save_slippage(&self, record: &SlippageRecord) -> Result<(), AuditError> {
        self.records.write().slippage.push(record.clone());
        Ok(())
    }

    async fn slippage_records(&self, run_id: &RunId) -> Result<Vec<SlippageRecord>, AuditError> {
        Ok(self
            .records
            .read()
            .slippage
            .iter()
            .filter(|record| &record.run_id == run_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::load_config_from_string;
    use crate::domain::risk_management::RiskGateMode;

    fn snapshot(data_id: &str) -> DecisionSnapshot {
        let doc = load_config_from_string("strategy:\n  id: alpha\n").unwrap();
        DecisionSnapshot::new(
            &doc,
            data_id,
            Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
        )
    }

    fn event(run_id: &str) -> RiskGateEvent {
        RiskGateEvent {
            run_id: RunId::new(run_id),
            mode: RiskGateMode::Shadow,
            passed: true,
            would_block: false,
            violation_count: 0,
            metrics: BTreeMap::new(),
            violations: Vec::new(),
            message: "ok".to_string(),
        }
    }

    #[tokio::test]
    async fn identical_snapshot_is_idempotent() {
        let repo = InMemoryAuditRepository::new();
        repo.save_snapshot(&snapshot("snap-1")).await.unwrap();
        repo.save_snapshot(&snapshot("snap-1")).await.unwrap();
        assert_eq!(repo.snapshot_count(), 1);

        let found = repo
            .find_snapshot(&StrategyId::new("alpha"), NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
            .await
            .unwrap();
        assert_eq!(found, Some(snapshot("snap-1")));
    }

    #[tokio::test]
    async fn differing_snapshot_conflicts() {
        let repo = InMemoryAuditRepository::new();
        repo.save_snapshot(&snapshot("snap-1")).await.unwrap();
        let err = repo.save_snapshot(&snapshot("snap-2")).await.unwrap_err();
        assert!(matches!(err, AuditError::SnapshotConflict { .. }));
    }

    #[tokio::test]
    async fn risk_events_are_filtered_by_run() {
        let repo = InMemoryAuditRepository::new();
        repo.save_risk_event(&event("run-1")).await.unwrap();
        repo.save_risk_event(&event("run-2")).await.unwrap();
        repo.save_risk_event(&event("run-1")).await.unwrap();

        assert_eq!(repo.risk_events(&RunId::new("run-1")).await.unwrap().len(), 2);
        assert!(repo.slippage_records(&RunId::new("run-1")).await.unwrap().is_empty());
    }
}
