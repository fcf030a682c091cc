//! Decision Snapshot
//!
//! The hashed record of which configuration and data version produced a
//! decision cycle. Created once per cycle before any stage runs; the run id,
//! order ids and order timestamps are all derived from it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigDocument;
use crate::domain::shared::{RunId, StrategyId};

/// Length of the config-hash prefix embedded in run ids.
const HASH_PREFIX_LEN: usize = 12;

/// Reproducibility record for one decision cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    /// Deterministic run identifier.
    pub run_id: RunId,
    /// Canonical configuration hash.
    pub config_hash: String,
    /// Configuration document as written.
    pub raw_config: String,
    /// Strategy identifier.
    pub strategy_id: StrategyId,
    /// Version of this engine.
    pub code_version: String,
    /// Upstream data snapshot identifier.
    pub data_snapshot_id: String,
    /// Decision date.
    pub decision_date: NaiveDate,
    /// Decision time; every order timestamp derives from it.
    pub created_at: DateTime<Utc>,
}

impl DecisionSnapshot {
    /// Build the snapshot for a cycle.
    #[must_use]
    pub fn new(
        document: &ConfigDocument,
        data_snapshot_id: impl Into<String>,
        decided_at: DateTime<Utc>,
    ) -> Self {
        let strategy_id = StrategyId::new(document.config.strategy.id.clone());
        let decision_date = decided_at.date_naive();
        Self {
            run_id: Self::derive_run_id(&strategy_id, decision_date, &document.hash),
            config_hash: document.hash.clone(),
            raw_config: document.raw.clone(),
            strategy_id,
            code_version: env!("CARGO_PKG_VERSION").to_string(),
            data_snapshot_id: data_snapshot_id.into(),
            decision_date,
            created_at: decided_at,
        }
    }

    /// `{strategy}-{yyyymmdd}-{hash prefix}`.
    #[must_use]
    pub fn derive_run_id(strategy_id: &StrategyId, date: NaiveDate, config_hash: &str) -> RunId {
        let prefix: String = config_hash.chars().take(HASH_PREFIX_LEN).collect();
        RunId::new(format!("{strategy_id}-{}-{prefix}", date.format("%Y%m%d")))
    }
}
