//! Strategy identity.

use serde::{Deserialize, Serialize};

/// Identity of the strategy that owns the decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Strategy identifier, part of the audit key.
    #[serde(default = "default_strategy_id")]
    pub id: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            id: default_strategy_id(),
            description: String::new(),
        }
    }
}

fn default_strategy_id() -> String {
    "tiered-multifactor".to_string()
}
