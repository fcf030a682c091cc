//! Persistence Adapters
//!
//! Implementations of the audit repository port.

pub mod in_memory;
pub mod jsonl;

pub use in_memory::InMemoryAuditRepository;
pub use jsonl::JsonlAuditRepository;
