//! Append-only JSON-lines audit repository.
//!
//! One file per record kind inside a directory:
//!
//! - `snapshots.jsonl`
//! - `risk_events.jsonl`
//! - `slippage.jsonl`
//!
//! Records are appended, never rewritten. Reads scan the whole file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::in_memory::check_snapshot;
use crate::application::ports::{AuditError, AuditRepository, SlippageRecord};
use crate::domain::risk_management::RiskGateEvent;
use crate::domain::shared::{RunId, StrategyId};
use crate::domain::snapshot::DecisionSnapshot;

const SNAPSHOTS: &str = "snapshots.jsonl";
const RISK_EVENTS: &str = "risk_events.jsonl";
const SLIPPAGE: &str = "slippage.jsonl";

/// JSON-lines implementation of `AuditRepository`.
#[derive(Debug)]
pub struct JsonlAuditRepository {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditRepository {
    /// Open (creating if needed) the audit directory.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Storage` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error(&dir, &e))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Audit directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn append<T: Serialize + Sync>(&self, file: &str, record: &T) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let path = self.dir.join(file);
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| storage_error(&path, &e))?;
        handle
            .write_all(line.as_bytes())
            .await
            .map_err(|e| storage_error(&path, &e))?;
        handle.flush().await.map_err(|e| storage_error(&path, &e))?;
        debug!(path = %path.display(), "Audit record appended");
        Ok(())
    }

    async fn read_all<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, AuditError> {
        let path = self.dir.join(file);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(&path, &e)),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> AuditError {
    AuditError::Storage {
        message: format!("{}: {err}", path.display()),
    }
}

#[async_trait]
impl AuditRepository for JsonlAuditRepository {
    async fn save_snapshot(&self, snapshot: &DecisionSnapshot) -> Result<(), AuditError> {
        let _guard = self.write_lock.lock().await;
        let existing = self
            .find_snapshot(&snapshot.strategy_id, snapshot.decision_date)
            .await?;
        if check_snapshot(existing.as_ref(), snapshot)? {
            self.append(SNAPSHOTS, snapshot).await?;
        }
        Ok(())
    }

    async fn find_snapshot(
        &self,
        strategy_id: &StrategyId,
        date: NaiveDate,
    ) -> Result<Option<DecisionSnapshot>, AuditError> {
        let snapshots: Vec<DecisionSnapshot> = self.read_all(SNAPSHOTS).await?;
        Ok(snapshots
            .into_iter()
            .find(|s| &s.strategy_id == strategy_id && s.decision_date == date))
    }

    async fn save_risk_event(&self, event: &RiskGateEvent) -> Result<(), AuditError> {
        let _guard = self.write_lock.lock().await;
        self.append(RISK_EVENTS, event).await
    }

    async fn risk_events(&self, run_id: &RunId) -> Result<Vec<RiskGateEvent>, AuditError> {
        let events: Vec<RiskGateEvent> = self.read_all(RISK_EVENTS).await?;
        Ok(events.into_iter().filter(|e| &e.run_id == run_id).collect())
    }

    async fn save_slippage(&self, record: &SlippageRecord) -> Result<(), AuditError> {
        let _guard = self.write_lock.lock().await;
        self.append(SLIPPAGE, record).await
    }

    async fn slippage_records(&self, run_id: &RunId) -> Result<Vec<SlippageRecord>, AuditError> {
        let records: Vec<SlippageRecord> = self.read_all(SLIPPAGE).await?;
        Ok(records.into_iter().filter(|r| &r.run_id == run_id).collect())
    }
}
