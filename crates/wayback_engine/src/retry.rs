//! Fixed-delay retry policy shared by the resolve and fetch steps.

use std::future::Future;
use std::time::Duration;

use engine_logging::engine_debug;
use wayback_core::FailureReason;

use crate::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-attempts after the first try. Zero disables retrying.
    pub retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
    /// Also retry 5xx responses.
    pub retry_server_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(2),
            retry_server_errors: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn is_retryable(&self, kind: &FailureReason) -> bool {
        match kind {
            FailureReason::Timeout | FailureReason::Network => true,
            FailureReason::HttpStatus(code) => self.retry_server_errors && (500..=599).contains(code),
            _ => false,
        }
    }

    /// `attempt` is 1-based and names the attempt that just failed.
    pub fn decide(&self, attempt: u32, kind: &FailureReason) -> RetryDecision {
        if attempt >= self.max_attempts() || !self.is_retryable(kind) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay)
    }
}

/// Runs `op` until it succeeds or the policy says to stop.
///
/// `op` receives the 1-based attempt number. `on_retry` is told about every
/// retry before the delay starts, with the number of the upcoming attempt.
/// The delay is an async sleep, so other tasks keep running.
pub async fn run_with_retry<T, F, Fut, R>(
    policy: &RetryPolicy,
    mut on_retry: R,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    R: FnMut(u32, Duration, &FetchError),
{
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => match policy.decide(attempt, &err.kind) {
                RetryDecision::NoRetry => return Err(err),
                RetryDecision::RetryAfter(delay) => {
                    engine_debug!("attempt {} failed ({}), retrying in {:?}", attempt, err, delay);
                    attempt += 1;
                    on_retry(attempt, delay, &err);
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }
}
