//! Dependency Injection Container
//!
//! Wires the adapters selected by the configuration into the use case and
//! the order monitor.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::info;

use crate::application::ports::{AuditRepository, Broker, QualityGateError};
use crate::application::services::OrderMonitor;
use crate::application::use_cases::RunPipelineUseCase;
use crate::config::{BrokerKind, ConfigDocument};
use crate::domain::portfolio::PortfolioContext;
use crate::error::PipelineError;
use crate::infrastructure::broker::{
    BrokerRetryPolicy, HttpBroker, RetryingBroker, SimulatedBroker,
};
use crate::infrastructure::market_data::JsonSnapshotRepository;
use crate::infrastructure::persistence::{InMemoryAuditRepository, JsonlAuditRepository};

/// Decision time for a date: midnight UTC, so reruns share every timestamp.
#[must_use]
pub fn decision_time(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Wired dependencies for one decision date.
pub struct Container {
    document: ConfigDocument,
    data: Arc<JsonSnapshotRepository>,
    broker: Arc<dyn Broker>,
    audit: Arc<dyn AuditRepository>,
    date: NaiveDate,
}

impl Container {
    /// Load the market snapshot and build the configured adapters.
    ///
    /// Without `audit_dir` the audit trail is kept in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded, the audit directory
    /// cannot be opened or the broker cannot be constructed.
    pub async fn build(
        document: ConfigDocument,
        data_path: &Path,
        audit_dir: Option<&Path>,
        date: NaiveDate,
    ) -> Result<Self, PipelineError> {
        let data = JsonSnapshotRepository::load(data_path).map_err(|e| {
            PipelineError::QualityGate(QualityGateError::Unavailable {
                message: e.to_string(),
            })
        })?;
        let data = Arc::new(data);

        let audit: Arc<dyn AuditRepository> = match audit_dir {
            Some(dir) => Arc::new(JsonlAuditRepository::open(dir).await?),
            None => Arc::new(InMemoryAuditRepository::new()),
        };

        let config = &document.config.broker;
        let inner: Arc<dyn Broker> = match config.kind {
            BrokerKind::Simulated => Arc::new(simulated_broker(&data, date)),
            BrokerKind::Http => Arc::new(HttpBroker::new(config)?),
        };
        let broker: Arc<dyn Broker> = Arc::new(RetryingBroker::new(
            inner,
            BrokerRetryPolicy::from(&config.retry),
        ));

        info!(
            broker = ?config.kind,
            audit = audit_dir.map_or_else(|| "memory".to_string(), |d| d.display().to_string()),
            snapshot_id = data.snapshot_id(),
            "Container initialized"
        );

        Ok(Self {
            document,
            data,
            broker,
            audit,
            date,
        })
    }

    /// The broker, retry layer included.
    pub fn broker(&self) -> Arc<dyn Broker> {
        Arc::clone(&self.broker)
    }

    /// The audit repository.
    pub fn audit(&self) -> Arc<dyn AuditRepository> {
        Arc::clone(&self.audit)
    }

    /// Capital, holdings, prices and liquidity at the decision date.
    pub fn portfolio_context(&self) -> PortfolioContext {
        self.data.portfolio_context(self.date)
    }

    /// Order monitor sharing this container's broker and audit trail.
    pub fn order_monitor(&self) -> Arc<OrderMonitor<dyn Broker, dyn AuditRepository>> {
        Arc::new(OrderMonitor::new(
            self.broker(),
            self.audit(),
            self.document.config.broker.request_timeout(),
        ))
    }

    /// Create a `RunPipelineUseCase`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal worker pool cannot be created.
    pub fn run_pipeline_use_case(
        &self,
    ) -> Result<RunPipelineUseCase<dyn Broker, dyn AuditRepository>, PipelineError> {
        RunPipelineUseCase::new(
            self.document.clone(),
            self.data.clone(),
            self.data.clone(),
            self.audit(),
            self.broker(),
        )
    }
}

fn simulated_broker(data: &JsonSnapshotRepository, date: NaiveDate) -> SimulatedBroker {
    let context = data.portfolio_context(date);
    let mut broker = SimulatedBroker::new(data.account().cash, decision_time(date));
    for (code, price) in context.prices {
        broker = broker.with_price(code, price);
    }
    for holding in context.holdings.into_values() {
        broker = broker.with_holding(holding);
    }
    broker
}
