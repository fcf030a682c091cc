//! Risk Management Bounded Context
//!
//! Pre-trade check of a target portfolio before any order is generated.
//!
//! # Key Concepts
//!
//! - **Risk Model**: per-instrument volatilities with a constant pairwise
//!   correlation, estimated from price history
//! - **Risk Gate**: parametric VaR and concentration limits, run in
//!   OFF, SHADOW or ENFORCE mode
//! - **Risk Gate Event**: append-only audit record of every check

pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::RiskGateViolation;
pub use services::{RiskGate, var_metric_key};
pub use value_objects::{
    ConstraintResult, ConstraintViolation, RiskGateEvent, RiskGateMode, RiskModel,
    ViolationCode, ViolationSeverity, inverse_normal_cdf,
};
