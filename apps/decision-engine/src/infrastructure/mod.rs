//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `broker/`: HTTP broker, simulated broker, retry decorator, sessions
//! - `market_data/`: JSON market snapshot as data repository and universe
//! - `persistence/`: in-memory and JSON-lines audit repositories
//! - `container`: wiring of the adapters selected by the configuration

pub mod broker;
pub mod container;
pub mod market_data;
pub mod persistence;
