//! Admission control and observability for the HTTP surface

pub mod metrics;
pub mod middleware;

pub use metrics::Metrics;
pub use middleware::{client_identity, Admission, Budget, RateLimitGate, RateLimiter};
