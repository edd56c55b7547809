//! # `RetryConfig` – backoff tuning for transient command failures
//!
//! The n-th retry of a command waits `base_delay * 2^(n-1)`, capped at
//! `max_delay`. With a non-zero `jitter` the delay is spread uniformly over
//! `delay * (1 ± jitter)` so that many workers retrying at once do not hit
//! the runtime in lockstep.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay, before jitter.
    pub max_delay: Duration,
    /// Fraction in `0.0..=1.0`. Zero keeps delays deterministic.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: 0.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return delay;
        }
        let factor = 1.0 + jitter * (fastrand::f64() * 2.0 - 1.0);
        delay.mul_f64(factor)
    }
}

/// How many times a command may be sent in total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryLimit {
    /// Keep retrying transient failures until a terminal response arrives.
    #[default]
    UntilComplete,
    /// At most this many sends, the first one included.
    Attempts(u32),
}

impl RetryLimit {
    pub fn allows_another_attempt(&self, attempts_so_far: u32) -> bool {
        match self {
            RetryLimit::UntilComplete => true,
            RetryLimit::Attempts(max_attempts) => attempts_so_far < *max_attempts,
        }
    }
}
