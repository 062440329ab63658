//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Retry policy for async operations.
///
/// An operation is retried when its error, or its successful but stale result,
/// is accepted by the caller's predicate. Delays grow geometrically from
/// `initial_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: u32,
    /// Sleep before the first attempt as well.
    pub delay_first: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
            delay_first: false,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempts and initial backoff, doubling each time.
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            ..Self::default()
        }
    }

    /// Lookups after a create lost a race: 3 lookups after 1s, 2s and 4s.
    #[must_use]
    pub fn race_recovery() -> Self {
        Self {
            delay_first: true,
            ..Self::default()
        }
    }

    /// Set whether to sleep before the first attempt.
    #[must_use]
    pub fn with_delay_first(mut self, delay_first: bool) -> Self {
        self.delay_first = delay_first;
        self
    }

    /// Delay before the `n`-th sleep (0-based).
    #[must_use]
    pub fn backoff(&self, n: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(n);
        self.initial_backoff.saturating_mul(factor)
    }

    /// Run `op` until it succeeds or errors with something `retry_error` rejects.
    ///
    /// Exhausting attempts returns the last error.
    pub async fn retry<T, E, F, Fut>(&self, op: F, retry_error: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.retry_if(op, retry_error, |_| false).await
    }

    /// Run `op`, retrying accepted errors and accepted ("stale") results.
    ///
    /// `op` receives the 0-based attempt number. When attempts run out, the
    /// last outcome is returned as is: the last error, or the last stale value
    /// for the caller to judge.
    pub async fn retry_if<T, E, F, Fut>(
        &self,
        mut op: F,
        retry_error: impl Fn(&E) -> bool,
        retry_result: impl Fn(&T) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            let sleeps = if self.delay_first {
                Some(attempt)
            } else {
                attempt.checked_sub(1)
            };
            if let Some(n) = sleeps {
                let delay = self.backoff(n);
                debug!(attempt, ?delay, "backing off");
                tokio::time::sleep(delay).await;
            }

            let outcome = op(attempt).await;
            attempt += 1;

            let again = match &outcome {
                Ok(value) => retry_result(value),
                Err(error) => retry_error(error),
            };
            if !again || attempt >= max_attempts {
                return outcome;
            }
        }
    }
}
