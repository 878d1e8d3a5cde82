//! Attempt observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring a retry
//! chain and a `TracingObserver` implementation that logs using the
//! `tracing` crate.

use std::time::Duration;

use crate::error::AttemptError;

/// Observer trait for retry chain events
///
/// Implement this trait to receive callbacks as a chain runs. Observers
/// never influence scheduling decisions; they exist for logging, statistics
/// and debugging.
///
/// Attempt indices are 0-based: 0 is the first try, 1 the first retry.
/// `max_attempts` is the configured retry budget; negative means unbounded.
///
/// # Example
///
/// ```rust
/// use redrive::{AttemptError, RetryObserver};
/// use std::time::Duration;
///
/// struct MetricsObserver;
///
/// impl RetryObserver for MetricsObserver {
///     fn on_attempt_start(&self, _attempt: u32, _max_attempts: i32) {
///         // record attempt start metric
///     }
///
///     fn on_attempt_failed(&self, _attempt: u32, _error: &AttemptError, _delay: Duration) {
///         // record failure metric
///     }
///
///     fn on_success(&self, _attempt: u32, _total_duration: Duration) {
///         // record success metric with latency
///     }
///
///     fn on_exhausted(&self, _attempt: u32, _final_error: &AttemptError) {
///         // record exhaustion metric
///     }
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to start
    fn on_attempt_start(&self, attempt: u32, max_attempts: i32);

    /// Called when an attempt fails and a retry has been scheduled after
    /// `delay`
    fn on_attempt_failed(&self, attempt: u32, error: &AttemptError, delay: Duration);

    /// Called when an attempt succeeds
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when an attempt fails with no retry budget remaining
    fn on_exhausted(&self, attempt: u32, final_error: &AttemptError);

    /// Called when the operation gives up, suppressing any remaining budget
    fn on_gave_up(&self, attempt: u32, error: &AttemptError) {
        let _ = (attempt, error);
    }

    /// Called when a task observes that its handle was already cancelled
    /// and skips the attempt
    fn on_cancelled(&self, attempt: u32) {
        let _ = attempt;
    }
}

/// A no-op observer that does nothing
///
/// The default for [`RetryEngine::submit`](crate::RetryEngine::submit).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: i32) {}

    fn on_attempt_failed(&self, _attempt: u32, _error: &AttemptError, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempt: u32, _final_error: &AttemptError) {}
}

/// An observer that logs chain events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_attempt_failed`: WARN
/// - `on_success`: INFO (after at least one retry) or DEBUG (first try)
/// - `on_exhausted`: ERROR
/// - `on_gave_up`: WARN
/// - `on_cancelled`: DEBUG
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    ///
    /// # Arguments
    ///
    /// * `operation` - A descriptive name for the operation being retried
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: i32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            max_attempts = max_attempts,
            "starting attempt"
        );
    }

    fn on_attempt_failed(&self, attempt: u32, error: &AttemptError, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 0 {
            tracing::info!(
                operation = %self.operation,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempt: u32, final_error: &AttemptError) {
        tracing::error!(
            operation = %self.operation,
            attempt = attempt,
            error = %final_error,
            "retry budget exhausted"
        );
    }

    fn on_gave_up(&self, attempt: u32, error: &AttemptError) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            "operation gave up, not retrying"
        );
    }

    fn on_cancelled(&self, attempt: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            "attempt skipped, chain was cancelled"
        );
    }
}

/// An observer that collects statistics about a chain's attempts
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    /// Attempt start events
    pub attempt_starts: std::sync::atomic::AtomicU32,
    /// Failed attempt events (a retry was scheduled)
    pub failures: std::sync::atomic::AtomicU32,
    /// Success events
    pub successes: std::sync::atomic::AtomicU32,
    /// Exhaustion events
    pub exhaustions: std::sync::atomic::AtomicU32,
    /// Give-up events
    pub give_ups: std::sync::atomic::AtomicU32,
    /// Cancelled-short-circuit events
    pub cancellations: std::sync::atomic::AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of attempt starts
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Get the number of failures that led to a retry
    pub fn failures(&self) -> u32 {
        self.failures.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Get the number of successes
    pub fn successes(&self) -> u32 {
        self.successes.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Get the number of exhaustions
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Get the number of give-ups
    pub fn give_ups(&self) -> u32 {
        self.give_ups.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Get the number of cancelled short-circuits
    pub fn cancellations(&self) -> u32 {
        self.cancellations
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: i32) {
        self.attempt_starts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _attempt: u32, _error: &AttemptError, _delay: Duration) {
        self.failures
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempt: u32, _final_error: &AttemptError) {
        self.exhaustions
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_gave_up(&self, _attempt: u32, _error: &AttemptError) {
        self.give_ups
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_cancelled(&self, _attempt: u32) {
        self.cancellations
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: i32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, error: &AttemptError, delay: Duration) {
        (**self).on_attempt_failed(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempt: u32, final_error: &AttemptError) {
        (**self).on_exhausted(attempt, final_error)
    }

    fn on_gave_up(&self, attempt: u32, error: &AttemptError) {
        (**self).on_gave_up(attempt, error)
    }

    fn on_cancelled(&self, attempt: u32) {
        (**self).on_cancelled(attempt)
    }
}

/// Implement RetryObserver for Box<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: i32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, error: &AttemptError, delay: Duration) {
        (**self).on_attempt_failed(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempt: u32, final_error: &AttemptError) {
        (**self).on_exhausted(attempt, final_error)
    }

    fn on_gave_up(&self, attempt: u32, error: &AttemptError) {
        (**self).on_gave_up(attempt, error)
    }

    fn on_cancelled(&self, attempt: u32) {
        (**self).on_cancelled(attempt)
    }
}
