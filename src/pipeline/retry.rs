//! Retry logic with exponential backoff
//!
//! Wraps one unit of work with a bounded number of attempts. Each attempt is
//! bounded by a timeout; before attempt `i > 0` the executor sleeps
//! `backoff_factor * 2^(i-1)` seconds. Transient errors are absorbed and
//! only surface as [`RetryError::Exhausted`] once every attempt failed.

use crate::extract::ExtractError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Retry policy applied to every work item
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts
    pub max_retries: u32,

    /// Upper bound on a single attempt
    pub timeout: Duration,

    /// Base delay in seconds, doubled after every failed attempt
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            timeout: Duration::from_secs(10),
            backoff_factor: 1.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait before the given (zero-based) attempt
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = (self.backoff_factor * 2f64.powi(exponent)).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Terminal failure of a retried work item
#[derive(Debug, Error)]
pub enum RetryError<I: fmt::Debug> {
    /// Every attempt failed with a transient error
    #[error("Too many retries ({attempts}) for {item:?}")]
    Exhausted { item: I, attempts: u32 },

    /// The unit of work reported an error that no retry can fix
    #[error("Unrecoverable failure for {item:?}: {source}")]
    Fatal { item: I, source: ExtractError },
}

impl<I: fmt::Debug> RetryError<I> {
    /// The work item that failed
    pub fn item(&self) -> &I {
        match self {
            RetryError::Exhausted { item, .. } | RetryError::Fatal { item, .. } => item,
        }
    }
}

/// Runs `operation` until it succeeds, fails fatally, or runs out of attempts
///
/// # Arguments
///
/// * `item` - The work item, returned inside the error on failure
/// * `config` - Attempts, per-attempt timeout and backoff
/// * `operation` - Produces one attempt's future
///
/// # Example
///
/// ```no_run
/// use shopfront::pipeline::{retry, RetryConfig};
/// use shopfront::ExtractError;
///
/// # async fn example() {
/// let item = "https://www.example.com".to_string();
/// let rows = retry(&item, &RetryConfig::default(), || async {
///     Ok::<_, ExtractError>(vec![1, 2, 3])
/// })
/// .await;
/// assert_eq!(rows.unwrap().len(), 3);
/// # }
/// ```
pub async fn retry<I, R, F, Fut>(
    item: &I,
    config: &RetryConfig,
    mut operation: F,
) -> Result<Vec<R>, RetryError<I>>
where
    I: Clone + fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<R>, ExtractError>>,
{
    for attempt in 0..config.max_retries {
        let delay = config.backoff_before(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let error = match tokio::time::timeout(config.timeout, operation()).await {
            Ok(Ok(records)) => {
                if attempt > 0 {
                    tracing::debug!(attempts = attempt + 1, "Succeeded after retry for {:?}", item);
                }
                return Ok(records);
            }
            Ok(Err(e)) if !e.is_retryable() => {
                return Err(RetryError::Fatal {
                    item: item.clone(),
                    source: e,
                });
            }
            Ok(Err(e)) => e,
            Err(_) => ExtractError::Timeout(config.timeout),
        };

        tracing::warn!(
            error = %error,
            attempt = attempt + 1,
            max_retries = config.max_retries,
            "Attempt failed for {:?}",
            item
        );
    }

    Err(RetryError::Exhausted {
        item: item.clone(),
        attempts: config.max_retries,
    })
}
