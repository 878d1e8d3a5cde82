//! Delay strategies
//!
//! A [`DelayStrategy`] decides how long to wait before the next retry, as a
//! function of how many attempts have already completed. Strategies must be
//! pure apart from internal randomness and must never fail; invalid
//! parameters are rejected when the strategy is constructed.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;

/// Policy for choosing the pause before the next retry.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use redrive::{DelayStrategy, Exponential};
///
/// let strategy = Exponential::new(Duration::from_millis(10), 2.0).unwrap();
/// assert_eq!(strategy.next_delay(0), Duration::from_millis(10));
/// assert_eq!(strategy.next_delay(3), Duration::from_millis(80));
/// ```
pub trait DelayStrategy: Send + Sync {
    /// Choose the delay to insert after the given number of completed
    /// attempts. `completed_attempts` is 0 for the pause between the first
    /// try and the first retry.
    fn next_delay(&self, completed_attempts: u32) -> Duration;
}

/// Retry with no delay at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl DelayStrategy for Immediate {
    fn next_delay(&self, _completed_attempts: u32) -> Duration {
        Duration::ZERO
    }
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy)]
pub struct Fixed {
    delay: Duration,
}

impl Fixed {
    /// Create a fixed-delay strategy. `Duration` is unsigned, so any value
    /// is a valid configuration.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl DelayStrategy for Fixed {
    fn next_delay(&self, _completed_attempts: u32) -> Duration {
        self.delay
    }
}

/// A uniformly random delay drawn from `[min, max)` before every retry.
#[derive(Debug, Clone, Copy)]
pub struct Random {
    min: Duration,
    max: Duration,
}

impl Random {
    /// Create a random-delay strategy drawing uniformly from `[min, max)`.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::EmptyDelayRange`] if `max <= min`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if max <= min {
            return Err(ConfigError::EmptyDelayRange { min, max });
        }
        Ok(Self { min, max })
    }
}

impl DelayStrategy for Random {
    fn next_delay(&self, _completed_attempts: u32) -> Duration {
        rand::rng().random_range(self.min..self.max)
    }
}

/// Exponentially growing delay: `first * multiplier ^ completed_attempts`,
/// truncated to whole milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct Exponential {
    first: Duration,
    multiplier: f64,
}

impl Exponential {
    /// Create an exponential-backoff strategy.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::ZeroFirstDelay`] if `first` is zero, or
    /// [`ConfigError::InvalidMultiplier`] if `multiplier` is below 1.0.
    pub fn new(first: Duration, multiplier: f64) -> Result<Self, ConfigError> {
        if first.is_zero() {
            return Err(ConfigError::ZeroFirstDelay);
        }
        // also rejects NaN
        if !(multiplier >= 1.0) {
            return Err(ConfigError::InvalidMultiplier { multiplier });
        }
        Ok(Self { first, multiplier })
    }
}

impl DelayStrategy for Exponential {
    fn next_delay(&self, completed_attempts: u32) -> Duration {
        let factor = self.multiplier.powf(completed_attempts as f64);
        let delay_ms = (self.first.as_millis() as f64 * factor) as u64;
        Duration::from_millis(delay_ms)
    }
}

impl<S: DelayStrategy + ?Sized> DelayStrategy for Arc<S> {
    fn next_delay(&self, completed_attempts: u32) -> Duration {
        (**self).next_delay(completed_attempts)
    }
}

impl<S: DelayStrategy + ?Sized> DelayStrategy for Box<S> {
    fn next_delay(&self, completed_attempts: u32) -> Duration {
        (**self).next_delay(completed_attempts)
    }
}
