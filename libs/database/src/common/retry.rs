use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration for database connections.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// # Example
/// ```ignore
/// use database::common::{RetryConfig, retry_with_backoff};
///
/// let config = RetryConfig::new().with_max_retries(5);
/// let db = retry_with_backoff(|| database::postgres::connect(&url), config).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(err) if attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms",
                    attempt, config.max_retries, err, delay
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = ((delay as f64 * config.backoff_multiplier) as u64).min(config.max_delay_ms);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Retry with the default configuration.
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, RetryConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig::new().with_initial_delay(1);

        let result: Result<u32, String> = retry_with_backoff(
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err("transient".to_string()) } else { Ok(n) }
            },
            config,
        )
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig::new().with_max_retries(2).with_initial_delay(1);

        let result: Result<u32, String> = retry_with_backoff(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            },
            config,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3); // initial try + 2 retries
    }
}
