//! Bounded retries with exponential backoff
//!
//! Only errors classified as transient by [`DeployError::is_transient`] are
//! retried. Running out of attempts yields [`DeployError::RetriesExhausted`],
//! which callers can tell apart from a permanent failure.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::error::{DeployError, Result};

/// Default exponential backoff base delay.
const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
/// Default exponential backoff maximum delay.
const DEFAULT_MAX_DELAY_MS: u64 = 8000;
/// Default exponential backoff coefficient.
const DEFAULT_COEFFICIENT: u64 = 2;
/// Default number of attempts, including the first one.
const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Exponential backoff configuration for indexer requests and CLI calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Wait time before the second attempt.
    pub initial_delay_ms: u64,
    /// Maximum wait time between attempts.
    pub max_delay_ms: u64,
    /// The multiplier to apply to the previous delay to get the next delay.
    pub coefficient: u64,
    /// Maximum number of attempts, including the first one.
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            coefficient: DEFAULT_COEFFICIENT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// A policy that performs a single attempt.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(DeployError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.coefficient == 0 {
            return Err(DeployError::InvalidConfig(
                "retry.coefficient must be at least 1".to_string(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(DeployError::InvalidConfig(
                "retry.initial_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay to wait after the given failed attempt (1-based), without jitter.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let factor = self.coefficient.saturating_pow(exponent);
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        return Err(DeployError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last_error: Box::new(err),
                        });
                    }
                    let wait = with_jitter(self.delay_after(attempt));
                    warn!(
                        operation,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

// Up to 10% extra so repeated runs do not hit the indexer in lockstep.
fn with_jitter(delay: Duration) -> Duration {
    let max_extra = delay.as_millis() as u64 / 10;
    if max_extra == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=max_extra))
}
