//! Exponential backoff for transient failures.
//!
//! [`RetryPolicy::run`] re-invokes an operation while it fails with an error
//! that [`is_retryable`] classifies as transient, doubling the wait after
//! every attempt. Permanent failures (validation, 4xx responses, missing
//! resources) surface on the first attempt.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::IntakeError;

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait before the second attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Bounded exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy. A `max_attempts` of zero is treated as one.
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds, fails permanently, or runs out of
    /// attempts.
    ///
    /// # Errors
    ///
    /// Returns the operation's error unchanged when it is not retryable,
    /// [`IntakeError::RetriesExhausted`] after `max_attempts` transient
    /// failures, or [`IntakeError::Cancelled`] when `cancel` fires during a
    /// backoff wait.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, IntakeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IntakeError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if !is_retryable(&error) => return Err(error),
                Err(error) => error,
            };

            if attempt >= self.max_attempts {
                return Err(IntakeError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                backoff_ms = backoff.as_millis(),
                "retryable failure: {error}"
            );

            tokio::select! {
                () = sleep(backoff) => {}
                () = cancel.cancelled() => return Err(IntakeError::Cancelled),
            }

            backoff = backoff.saturating_mul(2);
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_BACKOFF)
    }
}

/// Reports whether `error` is a transient condition worth retrying.
///
/// Transport failures, 5xx responses and transient storage conditions are
/// retryable. Everything else is permanent.
#[must_use]
pub const fn is_retryable(error: &IntakeError) -> bool {
    match error {
        IntakeError::Network { .. } => true,
        IntakeError::Api {
            status: Some(status),
            ..
        } => matches!(*status, 500..=599),
        IntakeError::Persistence { transient, .. } => *transient,
        _ => false,
    }
}

#[cfg(test)]
mod tests;
