//! Deadlines and exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::Transient;

/// Retry configuration shared by every remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
    /// Deadline of one attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(5000),
            backoff_multiplier: 2.0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries; only the deadline applies.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            timeout,
            ..Self::default()
        }
    }

    /// Backoff step, capped at `max_delay`. Overflowing or non-finite
    /// products saturate to the cap.
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` once under the deadline.
    pub async fn once<Fut, T, E>(&self, operation: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Transient,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(res) => res,
            Err(_) => Err(E::timed_out(self.timeout)),
        }
    }

    /// Runs `operation` under the deadline, retrying transient failures with
    /// exponential backoff. Non-transient failures return immediately.
    pub async fn run<F, Fut, T, E>(&self, what: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        let mut delay = self.initial_delay.min(self.max_delay);

        loop {
            match self.once(operation()).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(what, attempt, "succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(what, attempts = attempt, error = %e, "giving up after transient failures");
                        return Err(e);
                    }

                    debug!(
                        what,
                        attempt,
                        max = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;

                    delay = self.next_delay(delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::errors::IndexError;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            backoff_multiplier: 2.0,
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let res: Result<u32, IndexError> = fast_policy(3)
            .run("upsert", || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(IndexError::Timeout(Duration::from_millis(1)))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(res.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let res: Result<(), IndexError> = fast_policy(5)
            .run("query", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(IndexError::NotFound("idx".into()))
                }
            })
            .await;
        assert!(matches!(res, Err(IndexError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let res: Result<(), IndexError> = fast_policy(2)
            .run("query", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(IndexError::Timeout(Duration::from_millis(1)))
                }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_call_becomes_timeout() {
        let policy = RetryPolicy::no_retry(Duration::from_millis(10));
        let res: Result<(), IndexError> = policy
            .once(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(IndexError::Timeout(_))));
    }

    #[test]
    fn backoff_saturates_at_max_delay() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.next_delay(Duration::from_millis(200)), Duration::from_millis(400));
        assert_eq!(policy.next_delay(Duration::from_secs(4)), Duration::from_secs(5));
        assert_eq!(policy.next_delay(Duration::MAX), Duration::from_secs(5));

        let runaway = RetryPolicy {
            backoff_multiplier: f64::INFINITY,
            ..policy
        };
        assert_eq!(runaway.next_delay(Duration::from_millis(1)), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn huge_initial_delay_is_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(u64::MAX),
            ..fast_policy(2)
        };
        let calls = Arc::new(AtomicU32::new(0));
        let res: Result<(), IndexError> = policy
            .run("upsert", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(IndexError::Timeout(Duration::from_millis(1)))
                }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
