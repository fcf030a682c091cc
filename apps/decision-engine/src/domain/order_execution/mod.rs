//! Order Execution Bounded Context
//!
//! Orders produced by the execution planner and their lifecycle once they
//! are handed to a broker.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: the planned order plus its broker-side progress
//! - **Order State Machine**: the only allowed status transitions
//! - **Slices**: large orders are split into scheduled child orders

pub mod aggregate;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order, OrderUpdate};
pub use errors::OrderError;
pub use services::OrderStateMachine;
pub use value_objects::{OrderSide, OrderStatus, OrderType, SliceInfo};
