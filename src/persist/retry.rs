//! Retry on optimistic-concurrency conflicts.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{PersistError, Result};

/// Backoff schedule for conflicting writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Multiplier applied after each conflict.
    pub factor: u32,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(10),
            factor: 2,
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and default delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the delay after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self.factor.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(multiplier)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// Runs `operation` until it succeeds, fails with a non-conflict error, or
/// the policy runs out of attempts.
///
/// Each attempt must re-read whatever state it compares against.
///
/// # Errors
///
/// Returns the first non-conflict error, or `RetriesExhausted` when every
/// attempt conflicted.
pub async fn retry_on_conflict<T, F, Fut>(policy: &RetryPolicy, key: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                if attempt == max_attempts {
                    warn!("Conflict writing {key} on final attempt {attempt}: {err}");
                    break;
                }
                let delay = policy.backoff_for(attempt);
                debug!("Conflict writing {key} (attempt {attempt}), retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }

    Err(PersistError::RetriesExhausted {
        attempts: max_attempts,
        key: key.to_string(),
    }
    .into())
}
