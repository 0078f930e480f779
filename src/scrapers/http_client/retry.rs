//! Bounded retry with linear backoff.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Status codes worth retrying.
pub const TRANSIENT_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504];

/// Whether an HTTP status is transient.
pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUS_CODES.contains(&status)
}

/// Result of a single attempt.
pub enum Attempt<T, E> {
    Done(T),
    /// Failure that may succeed on retry.
    Transient(E),
    /// Failure that will not change on retry.
    Fatal(E),
}

/// Retry policy: at most `max_attempts` requests per URL, sleeping
/// `base × retry_number` before each retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

    pub fn new(base: Duration) -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base * retry
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the zero-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Transient(err) => {
                    if attempt + 1 >= self.max_attempts {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    debug!("Transient failure ({}), retry {} in {:?}", err, attempt, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_transient_codes() {
        for code in [429, 500, 502, 503, 504] {
            assert!(is_transient_status(code));
        }
        for code in [400, 401, 403, 404, 501] {
            assert!(!is_transient_status(code));
        }
    }

    #[test]
    fn test_backoff_is_linear_and_non_decreasing() {
        let policy = RetryPolicy::new(Duration::from_millis(750));
        assert_eq!(policy.delay_for(1), Duration::from_millis(750));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1500));
        assert!(policy.delay_for(2) >= policy.delay_for(1));
    }

    #[tokio::test]
    async fn test_retries_are_capped() {
        let policy = RetryPolicy::new(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Attempt::Transient("503".to_string()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_is_not_retried() {
        let policy = RetryPolicy::new(Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Attempt::Fatal("404".to_string()) }
            })
            .await;

        assert_eq!(result, Err("404".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient() {
        let policy = RetryPolicy::new(Duration::from_millis(1));

        let result: Result<u32, String> = policy
            .run(|attempt| async move {
                if attempt == 0 {
                    Attempt::Transient("429".to_string())
                } else {
                    Attempt::Done(attempt)
                }
            })
            .await;

        assert_eq!(result, Ok(1));
    }
}
