//! Domain Layer
//!
//! Pure decision logic with no infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`signals`]: six factor scores per instrument, normalized cross-sectionally
//! - [`selection`]: hard-cut screening and weighted ranking
//! - [`portfolio`]: tiered target weights under position, sector and liquidity limits
//! - [`risk_management`]: parametric VaR and concentration gate
//! - [`execution_planning`]: target weights to tick-correct, sliced orders
//! - [`order_execution`]: order aggregate and status state machine
//! - [`snapshot`]: reproducibility record of each decision cycle

pub mod execution_planning;
pub mod order_execution;
pub mod portfolio;
pub mod risk_management;
pub mod selection;
pub mod shared;
pub mod signals;
pub mod snapshot;
