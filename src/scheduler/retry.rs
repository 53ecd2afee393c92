//! Retry with exponential backoff around a single query.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::{RetryConfig, Span};
use crate::source::QueryError;

use super::session::secs;
use super::sleep_or_cancel;

/// Backoff policy for rate-limited queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Rate-limited attempts before the query is abandoned.
    pub max_retries: u32,
    /// Wait before the first retry, in seconds.
    pub base_wait_secs: f64,
    /// Multiplier band applied to every wait.
    pub jitter: Span,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_wait_secs: config.base_wait_secs,
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Wait after the `attempt`-th rate-limited failure (1-based):
    /// `base * 2^(attempt-1) * jitter`.
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let jitter = self.jitter.sample(rng);
        secs(self.base_wait_secs * 2f64.powi(exponent) * jitter)
    }
}

/// How a retried query ended.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    /// The query succeeded, possibly after retries.
    Completed(T),
    /// Every attempt was rate limited.
    Abandoned { attempts: u32 },
    /// A non rate-limit failure; not retried.
    Failed(QueryError),
    /// The cancellation token fired during a backoff wait.
    Cancelled,
}

/// Run `op` until it succeeds, fails for a reason other than rate
/// limiting, or has been rate limited `policy.max_retries` times.
///
/// Every rate-limited attempt is followed by a backoff wait, so a query
/// that is abandoned has waited exactly `max_retries` times. Never returns
/// an error to the caller; the outcome says what happened.
pub async fn run_with_retry<T, F, Fut, C, R>(
    policy: &RetryPolicy,
    clock: &C,
    rng: &mut R,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> QueryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, QueryError>>,
    C: Clock,
    R: Rng + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(query = %label, attempt, "query succeeded after retry");
                }
                return QueryOutcome::Completed(value);
            }
            Err(QueryError::RateLimited(reason)) => {
                let wait = policy.backoff(attempt, rng);
                tracing::warn!(
                    query = %label,
                    attempt,
                    max_retries = policy.max_retries,
                    wait_secs = wait.as_secs_f64(),
                    reason = %reason,
                    "rate limited, backing off"
                );
                if !sleep_or_cancel(clock, cancel, wait).await {
                    return QueryOutcome::Cancelled;
                }
                if attempt >= policy.max_retries {
                    tracing::warn!(query = %label, attempts = attempt, "giving up on query");
                    return QueryOutcome::Abandoned { attempts: attempt };
                }
            }
            Err(err) => {
                tracing::warn!(query = %label, error = %err, "query failed");
                return QueryOutcome::Failed(err);
            }
        }
    }
}
