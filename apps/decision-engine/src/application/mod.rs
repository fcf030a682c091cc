//! Application Layer
//!
//! Orchestrates the domain through one use case per decision cycle.
//! It defines:
//!
//! - **Ports**: broker, universe and audit interfaces
//! - **Services**: order submission and monitoring
//! - **Use Cases**: the decision pipeline
//! - **DTOs**: pipeline request and report

pub mod dto;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use dto::*;
pub use ports::*;
pub use services::*;
pub use use_cases::*;
