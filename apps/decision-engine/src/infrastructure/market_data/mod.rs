//! Market Data Adapters

pub mod snapshot;

pub use snapshot::{
    AccountSnapshot, InstrumentRecord, JsonSnapshotRepository, MarketSnapshot, SnapshotError,
};
