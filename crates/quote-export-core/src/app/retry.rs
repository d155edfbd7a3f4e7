//! Retry policy: re-runs a whole operation on transient failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::domain::ExportError;

/// Ceiling for a single backoff, however large the attempt count gets.
pub const MAX_DELAY: Duration = Duration::from_secs(10);

/// Retry policy for the export pipeline.
///
/// The wrapped operation is re-run from scratch; there is no resume point.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Base delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound of random delay added on top of the backoff.
    pub jitter: Duration,
}

impl RetryPolicy {
    /// One retry after a short pause. An invocation is short-lived, so a long
    /// backoff would only eat into the platform timeout.
    pub fn default_v1() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: Duration::from_millis(50),
        }
    }

    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Backoff before the next attempt, without jitter.
    ///
    /// `attempts` is the number of attempts already made (1-indexed):
    /// delay = min(base_delay * multiplier^(attempts - 1), MAX_DELAY)
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }

    fn jittered_delay(&self, attempts: u32) -> Duration {
        let delay = self.next_delay(attempts);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_v1()
    }
}

/// Run `op` until it succeeds, fails fatally, or attempts run out.
///
/// `op` receives the 1-indexed attempt number. Only errors whose kind is
/// transient are retried; the last error is returned unchanged.
pub async fn retry_operation<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ExportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ExportError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.jittered_delay(attempt);
                warn!(attempt, ?delay, error = %err, "transient failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
