//! Risk management value objects.

mod constraint_result;
mod risk_gate_event;
mod risk_model;

pub use constraint_result::{
    ConstraintResult, ConstraintViolation, ViolationCode, ViolationSeverity,
};
pub use risk_gate_event::{RiskGateEvent, RiskGateMode};
pub use risk_model::{RiskModel, inverse_normal_cdf};
