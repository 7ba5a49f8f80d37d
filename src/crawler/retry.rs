//! Retry budget, exponential backoff and request pacing
//!
//! Two delays shape the request rate:
//!
//! - [`RequestPacing`] sleeps before every uncached request. Its jittered base
//!   delay is stretched by the run's rolling error count, so the whole run slows
//!   down while the remote side is struggling.
//! - [`RetryPolicy`] sleeps between attempts of one failing request.
//!
//! # Backoff
//!
//! ```text
//! delay(attempt) = min(base * 2^(attempt - 1) + jitter, max_delay),  jitter in [0, base)
//! ```
//!
//! Jitter is always smaller than `base`, so the delay never shrinks from one
//! attempt to the next.

use crate::config::{HarvesterConfig, RetryConfig};
use rand::Rng;
use std::time::Duration;

/// Rolling errors beyond this count no longer stretch the pre-request delay
const MAX_SCALED_ERRORS: u32 = 20;

/// Attempt budget and backoff delays for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt)
    max_attempts: u32,

    /// Delay before the first retry
    base_delay: Duration,

    /// Cap on a single delay
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if another attempt may follow `attempt` (1-indexed)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after `attempt` (1-indexed) failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let jitter = if base_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..base_ms))
        };

        (self.exponential(attempt) + jitter).min(self.max_delay)
    }

    /// The un-jittered part of the delay: `base * 2^(attempt - 1)`
    fn exponential(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Jittered delay applied before every uncached request
#[derive(Debug, Clone)]
pub struct RequestPacing {
    min_delay: Duration,
    max_delay: Duration,
    error_factor: f64,
}

impl RequestPacing {
    pub fn new(min_delay: Duration, max_delay: Duration, error_factor: f64) -> Self {
        Self {
            min_delay: min_delay.min(max_delay),
            max_delay,
            error_factor: error_factor.max(0.0),
        }
    }

    pub fn from_config(config: &HarvesterConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_request_delay_ms),
            Duration::from_millis(config.max_request_delay_ms),
            config.error_delay_factor,
        )
    }

    /// No pre-request delay at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 0.0)
    }

    /// `uniform(min, max) * (1 + errors * factor)`
    pub fn delay_for(&self, rolling_errors: u32) -> Duration {
        let base = if self.max_delay > self.min_delay {
            rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
        } else {
            self.min_delay
        };
        let scale = self.scale(rolling_errors);
        if scale == 1.0 {
            base
        } else {
            base.mul_f64(scale)
        }
    }

    fn scale(&self, rolling_errors: u32) -> f64 {
        1.0 + rolling_errors.min(MAX_SCALED_ERRORS) as f64 * self.error_factor
    }
}
