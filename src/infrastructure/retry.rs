// Bounded retry with exponential backoff for backend calls
use crate::application::dashboard_api::ApiError;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after a failed `attempt` (1-based): `base_delay * 2^(attempt-1)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Run `op` until it succeeds, hits a non-retryable error, or runs out of attempts
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::error!(%label, attempts = attempt, error = %e, "Retries exhausted");
                    return Err(ApiError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        %label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn transport() -> ApiError {
        ApiError::Transport("connection refused".into())
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("summary", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if n < 3 { Err(transport()) } else { Ok("payload") } }
            })
            .await;

        assert_eq!(result, Ok("payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_cumulative_backoff() {
        let base = Duration::from_secs(1);
        let policy = RetryPolicy::new(3, base);
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), ApiError> = policy
            .run("series", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Status { status: 502, body: "bad gateway".into() }) }
            })
            .await;

        assert!(start.elapsed() >= base * 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(ApiError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ApiError::Status { status: 502, .. }));
            }
            other => panic!("expected exhausted retries, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sleep_after_final_attempt() {
        let base = Duration::from_secs(1);
        let policy = RetryPolicy::new(3, base);
        let start = Instant::now();

        let _ = policy
            .run("violations", |_| async { Err::<(), _>(transport()) })
            .await;

        // 1s + 2s between attempts, nothing after the third
        assert!(start.elapsed() < base * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = policy
            .run("summary", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Decode("expected object".into())) }
            })
            .await;

        assert_eq!(result, Err(ApiError::Decode("expected object".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
