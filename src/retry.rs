//! Bounded exponential-backoff retry for fallible async operations.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::api::ApiError;

/// How many times to retry and how long to wait in between.
///
/// The wait before retry `n` (0-based) is `initial_delay * backoff_factor^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub retries: u32,
  pub initial_delay: Duration,
  pub backoff_factor: u32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      retries: 3,
      initial_delay: Duration::from_millis(300),
      backoff_factor: 2,
    }
  }
}

impl RetryPolicy {
  /// A policy that makes exactly one attempt.
  pub fn none() -> Self {
    Self {
      retries: 0,
      ..Self::default()
    }
  }

  /// Total time spent sleeping when every attempt fails with a retryable error.
  pub fn worst_case_wait(&self) -> Duration {
    let mut total = Duration::ZERO;
    let mut delay = self.initial_delay;
    for _ in 0..self.retries {
      total = total.saturating_add(delay);
      delay = delay.saturating_mul(self.backoff_factor);
    }
    total
  }
}

/// Run `operation`, retrying retryable failures according to `policy`.
///
/// Client errors (status 400..=499) are returned on the first occurrence.
/// Waiting uses `tokio::time::sleep` and never blocks the runtime.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, ApiError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, ApiError>>,
{
  let mut remaining = policy.retries;
  let mut delay = policy.initial_delay;

  loop {
    match operation().await {
      Ok(value) => return Ok(value),
      Err(e) if !e.is_retryable() || remaining == 0 => return Err(e),
      Err(e) => {
        debug!(
          status = e.status(),
          error = %e,
          delay_ms = delay.as_millis() as u64,
          remaining,
          "retrying after failure"
        );
        tokio::time::sleep(delay).await;
        remaining -= 1;
        delay = delay.saturating_mul(policy.backoff_factor);
      }
    }
  }
}
