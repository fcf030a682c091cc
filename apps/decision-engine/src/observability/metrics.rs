//! Metrics for the decision engine.
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op. [`init_metrics`] installs a Prometheus
//! exporter when a listen address is configured.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Histogram buckets for durations, 10ms to 60s.
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Listen address could not be parsed.
    #[error("invalid metrics listen address '{0}'")]
    InvalidAddress(String),
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Install the Prometheus exporter if `listen_addr` is set.
///
/// Returns the bound address, or `None` when metrics stay disabled.
///
/// # Errors
///
/// Returns an error if the address is invalid or the exporter fails to start.
pub fn init_metrics(config: &MetricsConfig) -> Result<Option<SocketAddr>, MetricsError> {
    let Some(raw) = &config.listen_addr else {
        return Ok(None);
    };
    let addr: SocketAddr = raw
        .parse()
        .map_err(|_| MetricsError::InvalidAddress(raw.clone()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(DURATION_BUCKETS)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %addr, "Prometheus metrics exporter started");
    Ok(Some(addr))
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

/// Record the end of a decision cycle.
///
/// * `outcome` - `completed`, `risk_timeout` or an error code
pub fn record_pipeline_run(outcome: &str) {
    counter!("pipeline_runs_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a signal build.
pub fn record_signal_build(duration_seconds: f64, instruments: usize) {
    histogram!("signal_build_duration_seconds").record(duration_seconds);
    gauge!("signal_set_size").set(instruments as f64);
}

/// Record a risk gate check.
///
/// * `mode` - `SHADOW` or `ENFORCE`
/// * `breach` - whether blocking limits were breached
pub fn record_risk_gate_check(mode: &str, breach: bool) {
    counter!(
        "risk_gate_checks_total",
        "mode" => mode.to_string(),
        "verdict" => if breach { "breach" } else { "pass" }
    )
    .increment(1);
}

/// Record an execution plan.
pub fn record_plan(planned: usize, rejected: usize) {
    counter!("orders_planned_total").increment(planned as u64);
    counter!("orders_rejected_total").increment(rejected as u64);
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record a submission batch.
pub fn record_submission(submitted: usize, rejected: usize) {
    counter!("orders_submitted_total").increment(submitted as u64);
    counter!("order_submission_rejections_total").increment(rejected as u64);
}

/// Record one monitor poll.
pub fn record_monitor_tick(completed: usize, in_flight: usize) {
    if completed > 0 {
        counter!("orders_completed_total").increment(completed as u64);
    }
    gauge!("orders_in_flight").set(in_flight as f64);
}

/// Record realized slippage of a filled order, in basis points.
pub fn record_slippage(slippage_bps: f64) {
    histogram!("order_slippage_bps").record(slippage_bps);
}

// ============================================================================
// Broker Metrics
// ============================================================================

/// Record a retried broker call.
pub fn record_broker_retry(operation: &'static str) {
    counter!("broker_retries_total", "operation" => operation).increment(1);
}

/// Record a session token refresh.
pub fn record_token_refresh() {
    counter!("broker_token_refreshes_total").increment(1);
}
