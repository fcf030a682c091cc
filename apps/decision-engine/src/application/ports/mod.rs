//! Application Ports (Driven)
//!
//! Interfaces the pipeline uses to reach external systems: the broker, the
//! upstream universe, and audit storage. Market data is read through
//! [`crate::domain::signals::InstrumentDataRepository`].

mod audit_port;
mod broker_port;
mod universe_port;

#[cfg(test)]
pub use broker_port::MockBroker;
pub use audit_port::{AuditError, AuditRepository, SlippageRecord};
pub use broker_port::{
    AccountBalance, Broker, BrokerError, OrderAck, RequestContext, SubmitOrderRequest,
    is_retryable_status,
};
pub use universe_port::{QualityGateError, UniverseProvider, verify_universe};
