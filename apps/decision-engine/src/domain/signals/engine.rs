//! Signal engine.
//!
//! Loads raw data for every instrument in the universe, runs each factor
//! calculator on a bounded worker pool, normalizes each factor across the
//! cross-section and seals the result into a [`SignalSet`].

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::errors::{DataError, SignalError};
use super::factors::{FactorCalculator, default_calculators};
use super::normalizer::Normalizer;
use super::repository::InstrumentDataRepository;
use super::value_objects::{
    FactorKind, FactorReading, FactorScores, InstrumentData, SignalSet, StockSignals, Universe,
};
use crate::config::SignalsConfig;
use crate::domain::shared::InstrumentCode;
use crate::observability::record_signal_build;

/// A factor that fell back to neutral for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalWarning {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Affected factor, `None` when loading failed before any factor ran.
    pub factor: Option<FactorKind>,
    /// Cause.
    pub message: String,
}

/// Output of one build.
#[derive(Debug, Clone)]
pub struct SignalBuildReport {
    /// Sealed signals.
    pub signal_set: SignalSet,
    /// Neutral fallbacks caused by data defects or source failures.
    pub warnings: Vec<SignalWarning>,
}

struct Computed {
    code: InstrumentCode,
    name: String,
    readings: BTreeMap<FactorKind, Result<FactorReading, DataError>>,
    load_error: Option<DataError>,
}

/// Computes six normalized factor scores per instrument.
pub struct SignalEngine {
    calculators: Vec<Box<dyn FactorCalculator>>,
    normalizer: Normalizer,
    event_lookback_days: i64,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for SignalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalEngine")
            .field("calculators", &self.calculators.len())
            .field("threads", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl SignalEngine {
    /// Create an engine with the six standard calculators.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be created.
    pub fn new(config: &SignalsConfig) -> Result<Self, SignalError> {
        Self::with_calculators(config, default_calculators(config))
    }

    /// Create an engine with an explicit calculator set.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be created.
    pub fn with_calculators(
        config: &SignalsConfig,
        calculators: Vec<Box<dyn FactorCalculator>>,
    ) -> Result<Self, SignalError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrency.max(1))
            .thread_name(|i| format!("signal-worker-{i}"))
            .build()
            .map_err(|e| SignalError::ThreadPool {
                message: e.to_string(),
            })?;

        Ok(Self {
            calculators,
            normalizer: Normalizer::new(config.normalization.clone()),
            event_lookback_days: config.event.lookback_days,
            pool,
        })
    }

    /// Build the signal set for `universe` as of `as_of`.
    ///
    /// Never fails on per-instrument problems: the affected factor scores
    /// neutral and a warning is reported. Every universe instrument appears
    /// in the result.
    pub fn build(
        &self,
        universe: &Universe,
        repository: &dyn InstrumentDataRepository,
        as_of: DateTime<Utc>,
    ) -> SignalBuildReport {
        let started = Instant::now();
        let date = as_of.date_naive();
        let codes: Vec<&InstrumentCode> = universe.codes.iter().collect();

        let computed: Vec<Computed> = self.pool.install(|| {
            codes
                .par_iter()
                .map(|code| self.compute_one(code, repository, date))
                .collect()
        });

        let mut warnings = Vec::new();
        let mut raw_by_factor: BTreeMap<FactorKind, BTreeMap<InstrumentCode, f64>> =
            BTreeMap::new();

        for item in &computed {
            if let Some(err) = &item.load_error {
                warn!(code = %item.code, error = %err, "Instrument data load failed");
                warnings.push(SignalWarning {
                    code: item.code.clone(),
                    factor: None,
                    message: err.to_string(),
                });
            }
            for (kind, reading) in &item.readings {
                match reading {
                    Ok(reading) => {
                        raw_by_factor
                            .entry(*kind)
                            .or_default()
                            .insert(item.code.clone(), reading.raw);
                    }
                    Err(err) if err.is_gap() => {
                        debug!(code = %item.code, factor = %kind, error = %err, "Factor neutral");
                    }
                    Err(err) => {
                        warn!(code = %item.code, factor = %kind, error = %err, "Factor failed");
                        warnings.push(SignalWarning {
                            code: item.code.clone(),
                            factor: Some(*kind),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        let normalized: BTreeMap<FactorKind, BTreeMap<InstrumentCode, f64>> = raw_by_factor
            .iter()
            .map(|(kind, raw)| (*kind, self.normalizer.normalize(raw)))
            .collect();

        let signals = computed.into_iter().map(|item| {
            let mut scores = FactorScores::default();
            let mut signals = StockSignals::new(item.code.clone(), item.name, scores, as_of);
            for calculator in &self.calculators {
                let kind = calculator.kind();
                match (
                    item.readings.get(&kind),
                    normalized.get(&kind).and_then(|n| n.get(&item.code)),
                ) {
                    (Some(Ok(reading)), Some(score)) => {
                        scores.set(kind, *score);
                        signals.details.insert(kind, reading.details.clone());
                    }
                    _ => {
                        signals.neutral_factors.insert(kind);
                    }
                }
            }
            signals.scores = scores;
            signals
        });

        let signal_set = SignalSet::new(date, signals);
        let elapsed = started.elapsed();
        record_signal_build(elapsed.as_secs_f64(), signal_set.len());
        info!(
            instruments = signal_set.len(),
            warnings = warnings.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Signal set built"
        );

        SignalBuildReport {
            signal_set,
            warnings,
        }
    }

    fn compute_one(
        &self,
        code: &InstrumentCode,
        repository: &dyn InstrumentDataRepository,
        date: NaiveDate,
    ) -> Computed {
        let (data, name, load_error) = match self.load(code, repository, date) {
            Ok((data, name)) => (data, name, None),
            Err(err) => (InstrumentData::new(code.clone()), code.to_string(), Some(err)),
        };

        let readings = self
            .calculators
            .iter()
            .map(|calculator| {
                let reading = compute_isolated(calculator.as_ref(), &data, date);
                (calculator.kind(), reading)
            })
            .collect();

        Computed {
            code: code.clone(),
            name,
            readings,
            load_error,
        }
    }

    fn load(
        &self,
        code: &InstrumentCode,
        repository: &dyn InstrumentDataRepository,
        date: NaiveDate,
    ) -> Result<(InstrumentData, String), DataError> {
        let bar_lookback = self
            .calculators
            .iter()
            .map(|c| c.bars_required())
            .max()
            .unwrap_or(0);
        let flow_lookback = self
            .calculators
            .iter()
            .map(|c| c.flows_required())
            .max()
            .unwrap_or(0);

        let mut data = InstrumentData::new(code.clone());
        data.bars = repository.daily_bars(code, date, bar_lookback)?;
        data.fundamentals = repository.fundamentals(code, date)?;
        data.flows = repository.investor_flows(code, date, flow_lookback)?;
        data.events = repository.events(code, date, self.event_lookback_days)?;

        // Data dated after the decision date is never read.
        data.bars.retain(|bar| bar.date <= date);
        data.flows.retain(|flow| flow.date <= date);
        data.events.retain(|event| event.date <= date);

        let name = repository
            .profile(code)?
            .map_or_else(|| code.to_string(), |profile| profile.name);
        Ok((data, name))
    }
}

/// Run one calculator, turning a panic into a per-instrument error.
fn compute_isolated(
    calculator: &dyn FactorCalculator,
    data: &InstrumentData,
    date: NaiveDate,
) -> Result<FactorReading, DataError> {
    catch_unwind(AssertUnwindSafe(|| calculator.compute(data, date))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(DataError::Panicked {
            code: data.code.to_string(),
            factor: calculator.kind(),
            message,
        })
    })
}
