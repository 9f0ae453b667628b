//! Bounded retry with a fixed backoff schedule.
//!
//! The combinator knows nothing about what it retries: callers pass the
//! operation and, optionally, a predicate deciding which errors are worth
//! another attempt. Tests use [`RetryPolicy::immediate`] to skip sleeping.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `backoff[n - 1]`; the last entry repeats.
    pub backoff: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Vec<Duration>) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// No delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Vec::new())
    }

    /// Exponential schedule: `base`, `2*base`, `4*base`, ...
    pub fn exponential(max_attempts: u32, base: Duration) -> Self {
        let backoff = (0..max_attempts.saturating_sub(1))
            .map(|i| base.saturating_mul(1 << i.min(16)))
            .collect();
        Self::new(max_attempts, backoff)
    }

    /// Delay to wait after `failed_attempts` attempts have failed.
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let idx = failed_attempts.saturating_sub(1) as usize;
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` is reached.
///
/// `op` receives the zero-based attempt number.
pub async fn call_with_retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_when(policy, |_: &E| true, op).await
}

/// Like [`call_with_retry`], but gives up immediately on errors for which
/// `should_retry` returns false.
pub async fn retry_when<T, E, P, F, Fut>(
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    P: Fn(&E) -> bool,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts && should_retry(&e) => {
                attempt += 1;
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}
