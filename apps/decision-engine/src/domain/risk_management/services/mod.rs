//! Risk management domain services.

mod risk_gate;

pub use risk_gate::{RiskGate, var_metric_key};
