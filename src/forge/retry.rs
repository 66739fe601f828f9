//! Retry policy for forge calls.

use std::fmt::Display;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed-count retry policy with exponential backoff.
///
/// After the n-th failed attempt the caller waits `backoff_base^n` seconds,
/// unless that attempt was the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_base: u64,
}

impl RetryPolicy {
    /// Policy for the closed pull request query: 4 attempts, waits of 3s, 9s and 27s.
    pub const GRAPHQL: Self = Self {
        max_attempts: 4,
        backoff_base: 3,
    };

    /// Returns the wait after the given failed attempt, or `None` if no attempt is left.
    #[must_use]
    pub fn backoff(&self, failed_attempt: u32) -> Option<Duration> {
        (failed_attempt < self.max_attempts)
            .then(|| Duration::from_secs(self.backoff_base.saturating_pow(failed_attempt)))
    }

    /// Runs `operation` until it succeeds or the attempts are spent.
    ///
    /// `sleep` is invoked with each backoff delay. Returns `None` when every
    /// attempt failed.
    pub fn run<T, E, S, F>(&self, operation_name: &str, mut sleep: S, mut operation: F) -> Option<T>
    where
        E: Display,
        S: FnMut(Duration),
        F: FnMut(u32) -> Result<T, E>,
    {
        (1..=self.max_attempts).find_map(|attempt| match operation(attempt) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %err,
                    "Attempt failed"
                );
                if let Some(delay) = self.backoff(attempt) {
                    info!(
                        operation = operation_name,
                        delay_secs = delay.as_secs(),
                        "Retrying after backoff"
                    );
                    sleep(delay);
                }
                None
            },
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::GRAPHQL
    }
}
