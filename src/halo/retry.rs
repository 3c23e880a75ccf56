//! Retry policy for backend calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AppError;

/// Bounded retry with a fixed backoff.
///
/// Only `Unreachable` failures are retried; every other kind is returned on
/// the first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn should_retry(&self, err: &AppError, attempt: u32) -> bool {
        matches!(err, AppError::Unreachable(_)) && attempt < self.max_attempts
    }

    pub async fn run<F, Fut, T>(&self, label: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(val) => return Ok(val),
                Err(e) if self.should_retry(&e, attempt) => {
                    warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}",
                        label, attempt, self.max_attempts, e, self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_unreachable_is_retried_up_to_bound() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = policy
            .run("test", |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Unreachable("connection refused".into()))
            })
            .await;
        assert!(matches!(result, Err(AppError::Unreachable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_kinds_are_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = policy
            .run("test", |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::ServerError("HTTP 503".into()))
            })
            .await;
        assert!(matches!(result, Err(AppError::ServerError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let result = policy
            .run("test", |attempt| async move {
                if attempt == 1 {
                    Err(AppError::Unreachable("timeout".into()))
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(result, Ok(2));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
