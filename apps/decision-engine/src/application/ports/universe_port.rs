//! Universe Provider Port (Driven Port)
//!
//! The upstream quality gate and universe filter.

use chrono::NaiveDate;

use crate::domain::signals::Universe;

/// The upstream quality gate refused to release a universe.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualityGateError {
    /// Quality checks failed upstream.
    #[error("quality gate failed: {reason}")]
    Failed {
        /// Upstream reason.
        reason: String,
    },

    /// Universe is for a different date than requested.
    #[error("universe dated {actual}, expected {expected}")]
    DateMismatch {
        /// Requested date.
        expected: NaiveDate,
        /// Universe date.
        actual: NaiveDate,
    },

    /// No eligible instruments.
    #[error("universe for {date} is empty")]
    Empty {
        /// Decision date.
        date: NaiveDate,
    },

    /// Upstream could not be read.
    #[error("universe unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for the upstream universe.
pub trait UniverseProvider: Send + Sync {
    /// Universe of eligible instruments for `date`.
    ///
    /// # Errors
    ///
    /// Returns a `QualityGateError` when no trustworthy universe exists.
    fn universe(&self, date: NaiveDate) -> Result<Universe, QualityGateError>;
}

/// Verify an upstream universe before it reaches the signal engine.
///
/// # Errors
///
/// Returns an error when the upstream report failed, the date differs, or
/// no instruments remain.
pub fn verify_universe(universe: &Universe, date: NaiveDate) -> Result<(), QualityGateError> {
    if let Some(report) = &universe.quality_gate {
        if !report.passed {
            return Err(QualityGateError::Failed {
                reason: report
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("coverage {:.3}", report.coverage)),
            });
        }
    }
    if universe.date != date {
        return Err(QualityGateError::DateMismatch {
            expected: date,
            actual: universe.date,
        });
    }
    if universe.is_empty() {
        return Err(QualityGateError::Empty { date });
    }
    Ok(())
}
