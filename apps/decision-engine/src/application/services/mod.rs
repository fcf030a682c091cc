//! Application Services
//!
//! Long-running and concurrent collaborators of the pipeline: order
//! submission under a shared rate budget and background order monitoring.

mod order_monitor;
mod order_submitter;

pub use order_monitor::{MonitorTick, OrderMonitor};
pub use order_submitter::{OrderSubmitter, RateLimiter, SubmissionReport};
