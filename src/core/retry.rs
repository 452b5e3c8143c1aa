//! Retry logic for Bot API calls with exponential backoff.
//!
//! Used for the calls that must succeed before the bot can serve anyone:
//! `getMe` at startup and webhook registration. Per-request Bot API calls are
//! not retried here; the relay pipeline decides what a failed send means.

use crate::core::config;
use crate::core::error::AppError;
use crate::core::metrics;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Retry-related errors.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All retries exhausted, or the error was not retryable
    #[error("Max retries ({max_retries}) exhausted")]
    MaxRetriesExhausted { max_retries: u32, last_error: E },
}

impl<E> RetryError<E> {
    /// The error returned by the last attempt.
    pub fn into_last_error(self) -> E {
        match self {
            RetryError::MaxRetriesExhausted { last_error, .. } => last_error,
        }
    }
}

/// Retry strategy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter.
    #[must_use]
    pub fn no_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.add_jitter {
            // Add up to 25% jitter
            let jitter = rand::random::<f64>() * 0.25 * capped_delay;
            capped_delay + jitter
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Predefined retry configs.
impl RetryConfig {
    /// Startup `getMe`: Telegram may be briefly unreachable while the container starts.
    pub fn startup() -> Self {
        Self {
            max_retries: config::retry::STARTUP_MAX_ATTEMPTS - 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Webhook registration.
    pub fn webhook() -> Self {
        Self {
            max_retries: config::retry::WEBHOOK_MAX_ATTEMPTS - 1,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Config for quick retries (e.g., temporary failures).
    pub fn quick() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

/// Result of a retry attempt.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error)
    pub result: Result<T, RetryError<E>>,
    /// Number of attempts made
    pub attempts: u32,
    /// Total time spent retrying
    pub total_duration: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Returns true if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns true if all retries were exhausted.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.result, Err(RetryError::MaxRetriesExhausted { .. }))
    }

    /// Drops the bookkeeping and returns the last error on failure.
    pub fn into_result(self) -> Result<T, E> {
        self.result.map_err(RetryError::into_last_error)
    }
}

/// Determines if an error is retryable.
pub trait Retryable {
    /// Returns true if the error should be retried.
    fn is_retryable(&self) -> bool;

    /// Returns an optional hint for retry delay (e.g., from rate limit headers).
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for teloxide::RequestError {
    fn is_retryable(&self) -> bool {
        match self {
            teloxide::RequestError::Network(_) => true,
            teloxide::RequestError::RetryAfter(_) => true,
            teloxide::RequestError::Io(_) => true,
            teloxide::RequestError::Api(api_error) => {
                // Retry on server errors (5xx equivalent)
                let error_str = format!("{:?}", api_error);
                error_str.contains("Bad Gateway")
                    || error_str.contains("Service Unavailable")
                    || error_str.contains("Gateway Timeout")
                    || error_str.contains("Too Many Requests")
            }
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        if let teloxide::RequestError::RetryAfter(seconds) = self {
            Some(seconds.duration())
        } else {
            None
        }
    }
}

impl Retryable for std::io::Error {
    fn is_retryable(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::TimedOut
                | ErrorKind::Interrupted
                | ErrorKind::WouldBlock
        )
    }
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        match self {
            AppError::Telegram(e) => e.is_retryable(),
            AppError::Io(e) => e.is_retryable(),
            AppError::Http(e) => e.is_timeout() || e.is_connect(),
            AppError::HttpStatus(status) => status.is_server_error(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        AppError::retry_after(self)
    }
}

/// Executes an async operation with retry logic.
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation_name` - Label used in logs and the retry metric
/// * `operation` - The async operation to execute
///
/// # Returns
/// A `RetryResult` containing either the successful result or the last error.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, operation_name: &str, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Debug,
{
    let start = std::time::Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    log::info!("{} succeeded after {} attempt(s)", operation_name, attempts);
                }
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_duration: start.elapsed(),
                };
            }
            Err(e) if attempts <= config.max_retries && e.is_retryable() => {
                metrics::record_retry(operation_name);

                // Calculate delay (respect retry_after hint if provided)
                let delay = e
                    .retry_after()
                    .unwrap_or_else(|| config.delay_for_attempt(attempts - 1));

                log::warn!(
                    "Attempt {}/{} for {} failed (retrying in {:?}): {:?}",
                    attempts,
                    config.max_retries + 1,
                    operation_name,
                    delay,
                    e
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return RetryResult {
                    result: Err(RetryError::MaxRetriesExhausted {
                        max_retries: config.max_retries,
                        last_error: e,
                    }),
                    attempts,
                    total_duration: start.elapsed(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError(bool); // bool = is_retryable

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig::quick().initial_delay(Duration::from_millis(10)).no_jitter()
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let result = retry(&fast(), "op", || async { Ok::<_, TestError>(42) }).await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 1);
        assert_eq!(result.into_result().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&fast(), "op", || {
            let counter = counter_clone.clone();
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(TestError(true))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let config = fast().max_retries(2);
        let result = retry(&config, "op", || async { Err::<i32, _>(TestError(true)) }).await;

        assert!(result.is_exhausted());
        assert_eq!(result.attempts, 3); // 1 initial + 2 retries
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&fast(), "op", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError(false))
            }
        })
        .await;

        assert_eq!(result.attempts, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!result.into_result().unwrap_err().0);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_secs(1))
            .backoff_multiplier(2.0)
            .max_delay(Duration::from_secs(10))
            .no_jitter();

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(10)); // capped
    }

    #[test]
    fn test_app_error_classification() {
        assert!(AppError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut)).is_retryable());
        assert!(!AppError::Validation("bad".into()).is_retryable());
        assert!(AppError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY).is_retryable());
        assert!(!AppError::HttpStatus(reqwest::StatusCode::NOT_FOUND).is_retryable());
    }
}
