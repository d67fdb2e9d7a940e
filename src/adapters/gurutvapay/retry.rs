//! Retry with exponential backoff for transient gateway failures.
//!
//! Only [`FailureKind::Transient`](crate::domain::FailureKind::Transient)
//! outcomes (network errors, 5xx, 429) are retried. Anything else ends the
//! call immediately without consuming budget. Attempts run one at a time.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;

use crate::config::GatewayConfig;
use crate::domain::{Failure, RequestOutcome};
use crate::ports::GatewayError;

/// Retry budget and backoff schedule.
///
/// `max_retries` counts retries after the first attempt, so at most
/// `max_retries + 1` attempts are made. The delay before attempt `n`
/// (`n >= 2`) is `backoff_base * 2^(n-2)`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use gurutvapay::adapters::gurutvapay::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(500));
/// assert_eq!(policy.delay_before(2), Duration::from_millis(500));
/// assert_eq!(policy.delay_before(4), Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.max_retries, config.backoff_base())
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before 1-based attempt number `attempt`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.backoff_base.saturating_mul(factor)
    }

    /// Run `attempt` until it succeeds, fails non-transiently, or the budget
    /// runs out.
    ///
    /// An exhausted budget is reported using the last transient failure:
    /// 429 becomes `RateLimited`, 5xx becomes `Gateway`, and a network
    /// failure becomes `Transport`.
    pub async fn execute<F, Fut>(&self, mut attempt: F) -> Result<Value, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RequestOutcome>,
    {
        let max_attempts = self.max_attempts();
        let mut last_failure: Option<Failure> = None;

        for n in 1..=max_attempts {
            if n > 1 {
                sleep(self.delay_before(n)).await;
            }

            match attempt().await {
                RequestOutcome::Success(body) => return Ok(body),
                RequestOutcome::Failure(failure) if failure.kind.is_transient() => {
                    if n < max_attempts {
                        tracing::warn!(
                            attempt = n,
                            max_attempts,
                            status = failure.status,
                            delay_ms = self.delay_before(n + 1).as_millis() as u64,
                            "Transient gateway failure, retrying"
                        );
                    } else {
                        tracing::warn!(
                            attempt = n,
                            status = failure.status,
                            "Transient gateway failure, retry budget exhausted"
                        );
                    }
                    last_failure = Some(failure);
                }
                RequestOutcome::Failure(failure) => {
                    tracing::debug!(
                        status = failure.status,
                        kind = ?failure.kind,
                        "Non-retryable gateway failure"
                    );
                    return Err(GatewayError::from_failure(&failure));
                }
            }
        }

        Err(last_failure
            .map(|failure| GatewayError::from_failure(&failure))
            .unwrap_or_else(|| GatewayError::transport("No attempts made")))
    }
}
