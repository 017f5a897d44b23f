//! Retry logic with exponential backoff
//!
//! This module provides configurable retry logic for transient GitHub API
//! failures. It implements exponential backoff with optional jitter to
//! prevent thundering herd, and honors server-provided `Retry-After` hints
//! on rate-limit responses.

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, 5xx responses, rate limiting)
/// should return `true`. Permanent failures (not found, bad credentials,
/// undecodable bodies) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Server-provided wait hint to honor before the next attempt, if any
    fn retry_after_hint(&self) -> Option<Duration> {
        None
    }
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            // Network errors are generally retryable
            FetchError::Network(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status {
                status,
                retry_after,
            } => {
                // 5xx is transient; 429 is an explicit rate-limit signal.
                // GitHub reports secondary rate limits as 403 with a
                // Retry-After header — without the header a 403 is an
                // auth/permission problem and retrying cannot help.
                *status >= 500 || *status == 429 || (*status == 403 && retry_after.is_some())
            }
            // Undecodable bodies are permanent
            FetchError::Decode(_) => false,
            // Cancellation must not restart work
            FetchError::Cancelled => false,
        }
    }

    fn retry_after_hint(&self) -> Option<Duration> {
        match self {
            FetchError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result, or the last error together with the total
/// number of attempts made once the retry budget is exhausted.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                // A server-provided Retry-After hint overrides our own
                // backoff schedule for this wait
                let wait = match e.retry_after_hint() {
                    Some(hint) => hint.min(config.max_delay),
                    None if config.jitter => add_jitter(delay),
                    None => delay,
                };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = wait.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(wait).await;

                // Calculate next delay with exponential backoff
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err((e, attempt + 1));
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
        RateLimited(Duration),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Permanent => write!(f, "permanent error"),
                TestError::RateLimited(_) => write!(f, "rate limited"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            !matches!(self, TestError::Permanent)
        }

        fn retry_after_hint(&self) -> Option<Duration> {
            match self {
                TestError::RateLimited(hint) => Some(*hint),
                _ => None,
            }
        }
    }

    fn quick_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn success_needs_no_retry() {
        let config = RetryConfig::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fetch_with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn transient_error_retries_then_succeeds() {
        let config = quick_config(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fetch_with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "should retry twice before success"
        );
    }

    #[tokio::test]
    async fn exhausted_retries_report_attempt_count() {
        let config = quick_config(2);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fetch_with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        let (_, attempts) = result.unwrap_err();
        assert_eq!(attempts, 3, "initial try + 2 retries");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let config = RetryConfig::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fetch_with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Permanent)
            }
        })
        .await;

        let (_, attempts) = result.unwrap_err();
        assert_eq!(attempts, 1);
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "should not retry permanent error"
        );
    }

    #[tokio::test]
    async fn backoff_delays_increase_exponentially() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _result = fetch_with_retry(&config, || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 4, "initial + 3 retries = 4 calls");

        let gap1 = ts[1].duration_since(ts[0]);
        let gap2 = ts[2].duration_since(ts[1]);
        let gap3 = ts[3].duration_since(ts[2]);

        assert!(
            gap1 >= Duration::from_millis(40),
            "first delay should be ~50ms, was {:?}",
            gap1
        );
        assert!(
            gap2 >= Duration::from_millis(80),
            "second delay should be ~100ms, was {:?}",
            gap2
        );
        assert!(
            gap3 >= Duration::from_millis(160),
            "third delay should be ~200ms, was {:?}",
            gap3
        );
    }

    #[tokio::test]
    async fn individual_delays_never_exceed_max_delay() {
        // Without capping, delays would be 50ms, 500ms, 5000ms, 50000ms
        let config = RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            backoff_multiplier: 10.0,
            jitter: false,
        };

        let timestamps = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let ts_clone = timestamps.clone();

        let _result = fetch_with_retry(&config, || {
            let ts = ts_clone.clone();
            async move {
                ts.lock().await.push(std::time::Instant::now());
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        let ts = timestamps.lock().await;
        assert_eq!(ts.len(), 5, "initial + 4 retries = 5 calls");

        let max_allowed = Duration::from_millis(350); // 200ms + scheduling tolerance
        for i in 1..ts.len() {
            let gap = ts[i].duration_since(ts[i - 1]);
            assert!(
                gap <= max_allowed,
                "delay between attempt {} and {} was {:?}, exceeding max_delay + tolerance",
                i,
                i + 1,
                gap
            );
        }
    }

    #[tokio::test]
    async fn retry_after_hint_overrides_backoff() {
        let config = RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        let start = std::time::Instant::now();

        let _result = fetch_with_retry(&config, || async {
            Err::<i32, _>(TestError::RateLimited(Duration::from_millis(100)))
        })
        .await;

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(90),
            "should honor the 100ms retry-after hint, waited {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn retry_after_hint_is_capped_at_max_delay() {
        let config = RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter: false,
        };

        let start = std::time::Instant::now();

        // Hostile/huge hint must not stall the pipeline
        let _result = fetch_with_retry(&config, || async {
            Err::<i32, _>(TestError::RateLimited(Duration::from_secs(3600)))
        })
        .await;

        let elapsed = start.elapsed();
        assert!(
            elapsed < Duration::from_secs(2),
            "hint should be capped at max_delay, waited {:?}",
            elapsed
        );
    }

    #[test]
    fn add_jitter_stays_within_bounds() {
        let delay = Duration::from_millis(50);
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay,
                "iteration {i}: jittered {jittered:?} < base delay {delay:?}"
            );
            assert!(
                jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} > 2x base delay"
            );
        }
    }

    #[test]
    fn network_timeouts_are_retryable() {
        // reqwest::Error lacks a simple constructor, so network retryability
        // is exercised through the wiremock integration tests in github.rs
        let err = FetchError::Status {
            status: 503,
            retry_after: None,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn server_errors_and_rate_limits_are_retryable() {
        assert!(FetchError::Status {
            status: 500,
            retry_after: None
        }
        .is_retryable());
        assert!(FetchError::Status {
            status: 429,
            retry_after: Some(Duration::from_secs(1))
        }
        .is_retryable());
        assert!(FetchError::Status {
            status: 403,
            retry_after: Some(Duration::from_secs(1))
        }
        .is_retryable());
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!FetchError::Status {
            status: 404,
            retry_after: None
        }
        .is_retryable());
        // 403 without a Retry-After header is an auth/permission failure
        assert!(!FetchError::Status {
            status: 403,
            retry_after: None
        }
        .is_retryable());
        assert!(!FetchError::Decode("unexpected token".to_string()).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
    }

    #[test]
    fn retry_after_hint_comes_from_status_errors_only() {
        let err = FetchError::Status {
            status: 429,
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.retry_after_hint(), Some(Duration::from_secs(7)));
        assert_eq!(FetchError::Cancelled.retry_after_hint(), None);
    }
}
