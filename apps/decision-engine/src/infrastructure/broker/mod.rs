//! Broker Adapters
//!
//! Implementations of the `Broker` port plus the retry and session layers
//! wrapped around them.

pub mod http;
pub mod retry;
pub mod retrying;
pub mod session;
pub mod simulated;

pub use http::{HttpBroker, OAuthTokenIssuer};
pub use retry::{BrokerRetryPolicy, ExponentialBackoffCalculator, parse_retry_after};
pub use retrying::RetryingBroker;
pub use session::{SessionManager, SessionToken, TokenIssuer};
pub use simulated::SimulatedBroker;
