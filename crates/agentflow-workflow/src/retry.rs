use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Exponential backoff from `initial_backoff`, capped at `max_backoff`,
/// doubling after each attempt (spec §4.1 step 2: 1s -> 30s, <=3 attempts).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self { max_attempts, initial_backoff, max_backoff }
    }
}

/// Distinguishes retryable from fatal errors for [`retry`]. Implemented for
/// `ProviderError` so `InvokeLLM` retries transient (network/5xx) failures
/// and escalates permanent (auth/schema) ones immediately.
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

impl IsTransient for agentflow_providers::ProviderError {
    fn is_transient(&self) -> bool {
        agentflow_providers::ProviderError::is_transient(self)
    }
}

/// Retries `f` up to `policy.max_attempts` times while its error is
/// transient, sleeping with doubling backoff between attempts. A permanent
/// error or the final attempt's error is returned immediately.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;
    let mut backoff = policy.initial_backoff;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts && error.is_transient() => {
                warn!(attempt, max_attempts = policy.max_attempts, error = %error, "retrying after transient error");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky error")
        }
    }

    impl IsTransient for Flaky {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));
        let result: Result<u32, Flaky> = retry(policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(Flaky(true)) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));
        let result: Result<u32, Flaky> = retry(policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(Flaky(false)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_budget_returns_last_error() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5));
        let result: Result<u32, Flaky> = retry(policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(Flaky(true)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
