//! Exponential-backoff retry controller.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::SmsGateError;

/// Errors that know whether repeating the failed operation may succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Text recorded when a retry is scheduled. Must not carry secrets.
    fn log_message(&self) -> String;
}

impl Retryable for SmsGateError {
    fn is_retryable(&self) -> bool {
        SmsGateError::is_retryable(self)
    }

    fn log_message(&self) -> String {
        self.user_message()
    }
}

/// How many times to attempt an operation and how long to wait in between.
///
/// The wait after failed attempt `n` (1-based) is
/// `base_delay * backoff_multiplier^(n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. `0` is treated as `1`.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

    /// Default delays with a custom attempt ceiling.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::with_attempts(1)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent).max(0.0);
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay: Self::DEFAULT_BASE_DELAY,
            backoff_multiplier: Self::DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts. The closure receives the 1-based attempt number.
///
/// The error of the final attempt is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Retryable,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && err.is_retryable() => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err.log_message(),
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::domain::ValidationError;

    fn transient() -> SmsGateError {
        SmsGateError::Api {
            message: "bad gateway".to_owned(),
            status: Some(502),
            body: None,
        }
    }

    #[test]
    fn delay_grows_exponentially_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry(&RetryPolicy::with_attempts(3), |_| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(transient()) } else { Ok("sent") }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "sent");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_is_attempted_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = retry(&RetryPolicy::with_attempts(5), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SmsGateError::from(ValidationError::Empty { field: "message" }))
            }
        })
        .await;

        assert!(matches!(result, Err(SmsGateError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_attempt_error_is_returned_after_exhaustion() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = tokio::time::Instant::now();
        let result: Result<(), _> = retry(&RetryPolicy::default(), |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SmsGateError::Api {
                    message: format!("attempt {attempt}"),
                    status: Some(503),
                    body: None,
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(SmsGateError::Api { message, .. }) => assert_eq!(message, "attempt 3"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn log_message_masks_secrets_from_server_text() {
        let err = SmsGateError::from_http_status(
            500,
            r#"{"message":"upstream rejected token=SUPERSECRET123"}"#.to_owned(),
        );
        assert!(err.to_string().contains("SUPERSECRET123"));
        let logged = Retryable::log_message(&err);
        assert!(!logged.contains("SUPERSECRET123"));
        assert!(logged.contains("token=***"));
    }

    #[derive(Debug)]
    struct Flaky {
        logged: Arc<AtomicU32>,
    }

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            true
        }

        fn log_message(&self) -> String {
            self.logged.fetch_add(1, Ordering::SeqCst);
            "flaky".to_owned()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn each_scheduled_retry_logs_through_log_message() {
        let logged = Arc::new(AtomicU32::new(0));
        let errors = logged.clone();
        let result: Result<(), _> = retry(&RetryPolicy::with_attempts(3), |_| {
            let logged = errors.clone();
            async move { Err(Flaky { logged }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(logged.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let _ = retry(&RetryPolicy::with_attempts(0), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transient())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
