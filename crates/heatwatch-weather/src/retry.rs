//! Retry with exponential backoff for provider requests.
//!
//! Retried: timeouts, connection failures, 5xx, 429 and 408.
//! Not retried: other 4xx (bad key, unknown city) and request-building errors.
//!
//! Retries happen inside one fetch. The engine only ever sees the final
//! outcome, so a fetch that still fails after retries is a plain miss.

use std::future::Future;
use std::time::Duration;

use heatwatch_core::ProviderConfig;
use reqwest::{Response, StatusCode};

/// Backoff settings for one provider request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_retry_delay_ms),
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
        }
    }

    /// No retries; used by tests that want a single request.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

/// Whether a transport error is worth another attempt
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    if error.is_request() {
        return false;
    }
    error.status().is_some_and(is_retryable_status)
}

/// Whether a response status is worth another attempt
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Run `operation` until it succeeds, hits a permanent failure, or the
/// policy runs out of attempts.
///
/// A retryable status on the final attempt is returned as `Ok` so the caller
/// can map it to a typed error.
pub async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for_attempt(attempt - 1);
            tracing::debug!(
                "Retry attempt {} of {}, waiting {:?}",
                attempt,
                policy.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        let exhausted = attempt >= policy.max_retries;

        match operation().await {
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && !exhausted {
                    tracing::warn!(
                        "Provider returned {}, attempt {} of {}",
                        status,
                        attempt + 1,
                        policy.max_retries + 1
                    );
                    attempt += 1;
                    continue;
                }
                if attempt > 0 {
                    tracing::debug!("Request finished after {} retries", attempt);
                }
                return Ok(response);
            }
            Err(e) => {
                if exhausted || !is_retryable_error(&e) {
                    return Err(e);
                }
                tracing::warn!(
                    "Retryable error on attempt {} of {}: {}",
                    attempt + 1,
                    policy.max_retries + 1,
                    e
                );
                attempt += 1;
            }
        }
    }
}
