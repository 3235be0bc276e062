//! Resilience patterns for ranker-runtime.
//!
//! Currently retry with exponential backoff for transient scorer failures.

mod retry;

pub use retry::RetryPolicy;
