// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Decision Engine - Rust Core Library
//!
//! Deterministic signal-to-order pipeline for a long-only equity strategy.
//! Given a universe, per-instrument data and a configuration, one decision
//! cycle always produces the same signals, portfolio and orders.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `signals`: factor calculators, normalizer, signal engine
//!   - `selection`: screener and ranker
//!   - `portfolio`: tiered target portfolio construction
//!   - `risk_management`: pre-trade risk gate (SHADOW / ENFORCE)
//!   - `execution_planning`: quantities, tick-aligned limits, order splitting
//!   - `order_execution`: Order aggregate and status lifecycle
//!   - `snapshot`: decision snapshot and run identifiers
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `Broker`, `AuditRepository`, `UniverseProvider`
//!   - `services`: order submitter, order monitor
//!   - `use_cases`: `RunPipelineUseCase`
//!
//! - **Infrastructure**: Adapters
//!   - `broker`: HTTP and simulated brokers, retry decorator, sessions
//!   - `market_data`: JSON market snapshot
//!   - `persistence`: audit repositories
//!
//! Configuration lives in `config`, the pipeline error taxonomy in `error`
//! and logging/metrics setup in `observability`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Typed YAML configuration.
pub mod config;

/// Pipeline error taxonomy.
pub mod error;

/// Logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::dto::{PipelineReport, RunPipelineRequest};
pub use application::ports::{Broker, BrokerError, RequestContext};
pub use application::use_cases::RunPipelineUseCase;
pub use config::{Config, ConfigDocument, ConfigError, load_config, load_config_from_string};
pub use domain::order_execution::{Order, OrderSide, OrderStatus, OrderType};
pub use error::{ErrorCode, PipelineError, Stage};
