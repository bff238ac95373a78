//! Bounded exponential backoff around provider calls
//!
//! One caller, one in-flight request. The delay after failed attempt `i`
//! (0-based) is `base_delay * 2^i`; nothing sleeps after the last attempt.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Attempts actually made; zero is treated as a single try.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Sleep before the retry that follows failed attempt `attempt_index`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// The operation failed on every attempt it was allowed
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s): {}", self.attempts, self.last_error)
    }
}

/// Run `op` until it succeeds, hits a non-retryable error, or runs out of
/// attempts.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: R,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: fmt::Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0u32;

    loop {
        log::info!("{}: attempt {}/{}", label, attempt + 1, max_attempts);

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        log::warn!("{}: attempt {} failed: {}", label, attempt + 1, err);

        let remaining = attempt + 1 < max_attempts;
        if !remaining || !is_retryable(&err) {
            if remaining {
                log::warn!("{}: error is not retryable, giving up", label);
            }
            return Err(RetryExhausted {
                attempts: attempt + 1,
                last_error: err,
            });
        }

        let delay = policy.delay_for(attempt);
        log::info!("{}: retrying in {:.2}s", label, delay.as_secs_f64());
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
