//! Signal errors.

use thiserror::Error;

use super::value_objects::FactorKind;

/// Per-instrument data problem. Always recovered to a neutral score.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// Not enough history to compute the factor.
    #[error("{factor}: insufficient data for {code} (need {required}, have {available})")]
    Insufficient {
        /// Instrument code.
        code: String,
        /// Factor being computed.
        factor: FactorKind,
        /// Observations required.
        required: usize,
        /// Observations available.
        available: usize,
    },

    /// Required input is absent.
    #[error("{factor}: missing {input} for {code}")]
    Missing {
        /// Instrument code.
        code: String,
        /// Factor being computed.
        factor: FactorKind,
        /// Name of the missing input.
        input: String,
    },

    /// Input is present but unusable (zero prices, non-finite values).
    #[error("malformed data for {code}: {message}")]
    Malformed {
        /// Instrument code.
        code: String,
        /// What is wrong.
        message: String,
    },

    /// The data source failed.
    #[error("data source error for {code}: {message}")]
    Source {
        /// Instrument code.
        code: String,
        /// Source error message.
        message: String,
    },

    /// The calculator panicked.
    #[error("{factor}: calculator panicked for {code}: {message}")]
    Panicked {
        /// Instrument code.
        code: String,
        /// Factor being computed.
        factor: FactorKind,
        /// Panic payload.
        message: String,
    },
}

impl DataError {
    /// Whether the error is an expected gap rather than a data defect.
    #[must_use]
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::Insufficient { .. } | Self::Missing { .. })
    }
}

/// Signal engine setup failure.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Worker pool could not be created.
    #[error("Failed to initialize signal worker pool: {message}")]
    ThreadPool {
        /// Error message.
        message: String,
    },
}
