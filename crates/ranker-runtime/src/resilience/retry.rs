//! Retry with exponential backoff.
//!
//! Only transient failures are retried (see
//! [`InvocationError::is_transient`]). With `max_retries = 0` the operation
//! runs exactly once.

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;

use crate::scorer::InvocationError;

/// Upper bound for a single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(30);

/// How often and how patiently to retry a scorer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, min_delay: Duration) -> Self {
        Self {
            max_retries,
            min_delay,
        }
    }

    /// No retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Run `attempt`, retrying transient failures.
    pub async fn run<T, F, Fut>(&self, attempt: F) -> Result<T, InvocationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InvocationError>>,
    {
        let mut attempt = attempt;
        if self.max_retries == 0 {
            return attempt().await;
        }

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(MAX_DELAY)
            .with_max_times(self.max_retries);

        attempt
            .retry(backoff)
            .when(InvocationError::is_transient)
            .notify(|err: &InvocationError, delay: Duration| {
                tracing::warn!(error = %err, delay = ?delay, "Scorer call failed, retrying");
            })
            .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
