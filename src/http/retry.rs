//! Fixed-interval retry policy
//!
//! Wraps any fallible async operation and re-runs it while the error it
//! returns is classified as transient. The wait between attempts is constant:
//! the logs API answers 202 while an export is being prepared, which takes
//! roughly the same time no matter how often we ask.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default wait between attempts
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(120);

/// Bounded, constant-wait retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    wait: Duration,
    retryable: fn(&Error) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_WAIT)
    }
}

impl RetryPolicy {
    /// Retry errors that report themselves as retryable, waiting `wait` between tries
    pub fn fixed(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
            retryable: Error::is_retryable,
        }
    }

    /// Replace the predicate deciding which errors are retried
    #[must_use]
    pub fn with_predicate(mut self, retryable: fn(&Error) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Total attempts, including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait between attempts
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !(self.retryable)(&e) => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(Error::MaxRetriesExceeded {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, self.max_attempts, e, self.wait
                    );
                    tokio::time::sleep(self.wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 30);
        assert_eq!(policy.wait(), Duration::from_secs(120));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));

        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(Error::http_status(202, "preparing"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(4, Duration::from_millis(5));
        let started = Instant::now();

        let result: Result<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::http_status(500, "boom")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // three waits between four attempts
        assert!(started.elapsed() >= Duration::from_millis(15));
        match result.unwrap_err() {
            Error::MaxRetriesExceeded {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 4);
                assert!(last_error.contains("500"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(10, Duration::from_millis(1));

        let result: Result<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::auth(401, "bad token")) }
            })
            .await;

        assert!(result.unwrap_err().is_auth());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1)).with_predicate(|_| false);

        let result: Result<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::http_status(503, "")) }
            })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            Error::HttpStatus { status: 503, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
