//! Exponential backoff for idempotent service requests

use crate::config::RetryConfig;
use crate::domain::{LinkageError, PseudonymizerError, Result, StorageError};
use std::future::Future;
use std::time::Duration;

/// Whether a failed request may be sent again
///
/// Transport failures and server-side (5xx) rejections are retried; client
/// errors and unparseable replies are not.
pub fn is_retryable(error: &PseudonymizerError) -> bool {
    match error {
        PseudonymizerError::Linkage(LinkageError::TransportUnavailable(_)) => true,
        PseudonymizerError::Linkage(LinkageError::IssuanceRejected { status, .. }) => {
            *status >= 500
        }
        PseudonymizerError::Storage(StorageError::ConnectionFailed(_)) => true,
        PseudonymizerError::Storage(StorageError::RequestFailed { status, .. }) => *status >= 500,
        _ => false,
    }
}

/// Delay before attempt `attempt + 1`, capped at `max_delay_ms`
pub fn backoff_delay(config: &RetryConfig, attempt: usize) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let delay_ms = config.initial_delay_ms as f64 * config.backoff_multiplier.powi(exponent);
    Duration::from_millis((delay_ms as u64).min(config.max_delay_ms))
}

/// Retry a request with exponential backoff
///
/// Only use this for requests that are safe to repeat. Identity submissions
/// redeem a single-use token and must never go through here.
pub async fn retry_request<F, T, Fut>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_retries = config.max_retries;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                // attempt counts retries; the first request is not one
                attempt += 1;
                if attempt > max_retries || !is_retryable(&e) {
                    return Err(e);
                }

                let delay = backoff_delay(config, attempt);

                tracing::warn!(
                    attempt = attempt,
                    max_retries = max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying request after error"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
