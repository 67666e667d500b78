//! Bounded retry with exponential backoff for catalog HTTP calls.
//!
//! Every request the STAC client makes goes through [`send_with_retry`], so
//! transient failures (timeouts, connection resets, HTTP 429, HTTP 5xx) are
//! retried a fixed number of times before the unit of work is given up on.
//! Other 4xx responses are permanent and returned immediately.

use crate::catalog::error::CatalogError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many times, and how patiently, a failed request is retried.
///
/// The delay before retry `n` (1-based) is `base_delay * 2^(n-1)`, so the
/// defaults wait 2s, 4s and 8s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(with = "crate::utils::duration_secs")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Fail on the first error. This is the behaviour of a plain request.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub(crate) fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Sends the request built by `build_request`, retrying transient failures.
///
/// The closure is called once per attempt because a `RequestBuilder` is
/// consumed by `send()`. Returns the first response with a 2xx/3xx status.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    url: &str,
    build_request: F,
) -> Result<reqwest::Response, CatalogError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = policy.delay_before(attempt);
            warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && can_retry {
                    warn!("  transient error for {url}: {e}");
                    continue;
                }
                return Err(CatalogError::NetworkRequest(url.to_string(), e));
            }
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && can_retry {
                    warn!("  HTTP {status} for {url}");
                    continue;
                }
                if status.is_client_error() || status.is_server_error() {
                    return Err(CatalogError::HttpStatus {
                        url: url.to_string(),
                        status,
                    });
                }
                return Ok(response);
            }
        }
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
