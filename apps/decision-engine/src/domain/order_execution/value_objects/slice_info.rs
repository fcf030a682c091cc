//! Slice metadata for split orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::OrderId;

/// Position of a child order inside a split parent order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceInfo {
    /// Identifier of the unsplit parent order.
    pub parent_id: OrderId,
    /// Zero-based slice index.
    pub index: u32,
    /// Total number of slices.
    pub count: u32,
    /// Nominal slot relative to the decision time, kept for the audit trail.
    pub scheduled_at: DateTime<Utc>,
    /// Delay after the start of the submission batch.
    #[serde(default)]
    pub offset_secs: u64,
}
