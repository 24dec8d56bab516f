//! Bounded retry with linear backoff.
//!
//! Only calls that are safe to repeat blindly (device registration and the
//! like) are wrapped; state-changing domain calls are never retried.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::ApiError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Blocks the calling thread between attempts. Injected so tests run
/// without real waits.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// `max_attempts` below one is treated as one.
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is used up. The last error is returned. `op` receives
    /// the 1-based attempt number.
    pub fn run<T>(&self, mut op: impl FnMut(u32) -> Result<T, ApiError>) -> Result<T, ApiError> {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() || attempt >= self.max_attempts => return Err(err),
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt, max = self.max_attempts, ?delay, error = %err, "retrying");
                    self.sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
