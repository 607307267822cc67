//! Bounded retry with exponential backoff and jitter.
//!
//! Rendered pages are not always ready when first inspected: a result count
//! may not have been injected yet, a "load more" control may still be
//! animating in, an anchor element may arrive a moment after the load event.
//! [`retry`] re-runs an operation against a worker's session until it
//! succeeds or the attempt budget is spent, sleeping between attempts.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=jitter)
//! ```
//!
//! Setting `base_delay == max_delay` gives a fixed polling interval.

use futures::future::LocalBoxFuture;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
    /// Cap on the exponential delay.
    pub max_delay: Duration,
    /// Upper bound of the random extra delay.
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_millis(250),
        }
    }

    /// Poll every `interval` until `within` has elapsed.
    pub fn polling(interval: Duration, within: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            (within.as_millis() / interval.as_millis()).max(1) as u32
        };
        Self {
            max_attempts: attempts,
            base_delay: interval,
            max_delay: interval,
            jitter: Duration::ZERO,
        }
    }

    #[cfg(test)]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            delay
        } else {
            delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
        }
    }
}

/// The operation failed on every attempt.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for Exhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempts: {}", self.attempts, self.last_error)
    }
}

/// Run `op` against `ctx` until it succeeds or `policy.max_attempts` is reached.
///
/// `ctx` is usually the worker's session; it is lent to each attempt in turn.
///
/// # Example
///
/// ```ignore
/// let count = retry(session, &policy, "result_count", |s| {
///     async move { probe(s).await }.boxed_local()
/// })
/// .await?;
/// ```
pub async fn retry<C, T, E, Op>(
    ctx: &mut C,
    policy: &RetryPolicy,
    label: &str,
    mut op: Op,
) -> Result<T, Exhausted<E>>
where
    C: ?Sized,
    E: fmt::Display,
    Op: for<'a> FnMut(&'a mut C) -> LocalBoxFuture<'a, Result<T, E>>,
{
    let t0 = Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op(ctx).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, elapsed_ms = t0.elapsed().as_millis() as u64, "Retry succeeded");
                }
                return Ok(value);
            }
            Err(e) if attempt >= policy.max_attempts => {
                debug!(
                    label,
                    attempt,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    error = %e,
                    "Retries exhausted"
                );
                return Err(Exhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                if policy.max_attempts > 2 && attempt == 1 {
                    warn!(label, max = policy.max_attempts, ?delay, error = %e, "Attempt failed; retrying");
                } else {
                    debug!(label, attempt, ?delay, error = %e, "Attempt failed; retrying");
                }
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }
    }
}
