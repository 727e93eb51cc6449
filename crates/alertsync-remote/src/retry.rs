//! Bounded retries with jittered exponential backoff

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use tokio::time::Instant;

use crate::{RemoteError, Result};

/// How transport failures are retried.
///
/// Only [`RemoteError::Transport`] errors are retried. The delay before
/// attempt `n + 1` is drawn from `base * multiplier^(n-1)` randomized by
/// `jitter` and capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Randomization factor in `[0, 1]`
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn backoff(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.jitter.clamp(0.0, 1.0))
            .with_max_interval(self.max_delay)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `call` until it succeeds, fails permanently, runs out of
    /// attempts or reaches `deadline`.
    ///
    /// A call still in flight at the deadline is abandoned and reported as a
    /// timeout. No retry is scheduled if its delay would end past the
    /// deadline.
    pub async fn run<T, F, Fut>(&self, operation: &str, deadline: Instant, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match tokio::time::timeout_at(deadline, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => {
                    return Err(RemoteError::timeout(format!(
                        "{operation} did not finish before the deadline"
                    )));
                }
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= attempts {
                tracing::warn!(operation, attempts, error = %err, "Giving up after retries");
                return Err(err);
            }

            let delay = backoff.next_backoff().unwrap_or(self.max_delay);
            if Instant::now() + delay >= deadline {
                return Err(RemoteError::timeout(format!(
                    "{operation} out of time while retrying: {err}"
                )));
            }

            tracing::warn!(
                operation,
                attempt,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transport error"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    fn far() -> Instant {
        Instant::now() + Duration::from_secs(30)
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast()
            .run("list_rules", far(), || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RemoteError::server_error(503, "unavailable"))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = fast()
            .run("list_rules", far(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::timeout("slow"))
            })
            .await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = fast()
            .run("upsert_rule", far(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Rejected {
                    status: 400,
                    message: "bad rule".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Rejected { status: 400, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_abandons_slow_call() {
        let deadline = Instant::now() + Duration::from_millis(20);
        let result: Result<()> = fast()
            .run("get_rule", deadline, || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_no_retry_makes_one_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let _: Result<()> = RetryPolicy::no_retry()
            .run("delete_rule", far(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::server_error(500, "boom"))
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
