//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts. Identifiers are
//! ordered so that every collection keyed by them iterates deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Deterministic identifier for a planned order.");
define_id!(BrokerId, "Broker's unique identifier for an order.");
define_id!(
    InstrumentCode,
    "Exchange code of a tradeable instrument (e.g. \"005930\")."
);
define_id!(RunId, "Identifier of one decision cycle.");
define_id!(StrategyId, "Identifier of the strategy that owns a decision.");

impl InstrumentCode {
    /// Returns true if the code is empty or contains whitespace.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.0.is_empty() || self.0.chars().any(char::is_whitespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_display_inner_value() {
        let id = OrderId::new("run-1-005930-B-0");
        assert_eq!(id.to_string(), "run-1-005930-B-0");
        assert_eq!(id.as_str(), "run-1-005930-B-0");
    }

    #[test]
    fn identifiers_order_lexicographically() {
        let mut codes = vec![
            InstrumentCode::new("035720"),
            InstrumentCode::new("005930"),
            InstrumentCode::new("000660"),
        ];
        codes.sort();
        assert_eq!(codes[0].as_str(), "000660");
        assert_eq!(codes[2].as_str(), "035720");
    }

    #[test]
    fn instrument_code_malformed() {
        assert!(InstrumentCode::new("").is_malformed());
        assert!(InstrumentCode::new("00 5930").is_malformed());
        assert!(!InstrumentCode::new("005930").is_malformed());
    }

    #[test]
    fn identifiers_serialize_transparently() {
        let code = InstrumentCode::from("005930");
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"005930\"");
    }
}
