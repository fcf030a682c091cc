//! Observability: structured logging and metrics.

mod metrics;
mod tracing;

pub use self::metrics::{
    MetricsError, init_metrics, record_broker_retry, record_monitor_tick, record_pipeline_run,
    record_plan, record_risk_gate_check, record_signal_build, record_slippage, record_submission,
    record_token_refresh,
};
pub use self::tracing::{TracingError, env_filter, init_tracing};
