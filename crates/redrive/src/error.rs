//! Error types for the retry engine
//!
//! Configuration and lifecycle errors surface synchronously from the call
//! that caused them. Failures of the operation itself never escape the task
//! chain as errors; they are carried as data inside
//! [`ExecutionOutcome`](crate::ExecutionOutcome) via [`AttemptError`].

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while constructing a delay strategy or configuring the
/// engine's worker pool.
///
/// These are always raised at construction/initialization time, never from
/// inside a scheduled task.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Random delay range where `max` is not above `min`
    #[error("random delay range is empty: min {min:?} must be below max {max:?}")]
    EmptyDelayRange {
        /// Lower bound that was supplied
        min: Duration,
        /// Upper bound that was supplied
        max: Duration,
    },

    /// Exponential strategy with a zero first delay
    #[error("exponential first delay must be greater than zero")]
    ZeroFirstDelay,

    /// Exponential strategy with a multiplier below 1.0
    #[error("exponential multiplier must be at least 1.0, got {multiplier}")]
    InvalidMultiplier {
        /// Multiplier that was supplied
        multiplier: f64,
    },

    /// Worker pool configured with no workers
    #[error("worker pool size must be at least 1")]
    InvalidPoolSize,
}

/// Errors raised by [`RetryEngine`](crate::RetryEngine) lifecycle and
/// submission calls.
#[derive(Error, Debug)]
pub enum EngineError {
    /// `submit` was called before any delayed-executor capability was
    /// configured
    #[error("retry engine has not been initialized, call init_pool or init_with first")]
    NotInitialized,

    /// `init_pool`/`init_with` was called while a capability is already
    /// configured
    #[error("retry engine is already initialized")]
    AlreadyInitialized,

    /// Invalid configuration passed to an init call
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine-owned worker pool failed to start
    #[error("failed to start the worker pool: {0}")]
    PoolStart(#[from] std::io::Error),
}

/// Errors returned by [`RetryHandle::get`](crate::RetryHandle::get) and
/// [`RetryHandle::get_timeout`](crate::RetryHandle::get_timeout).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WaitError {
    /// The retry chain was cancelled; no outcome was ever produced
    #[error("retry chain was cancelled")]
    Cancelled,

    /// The timed wait expired before the chain completed. The chain keeps
    /// running; waiting again is allowed.
    #[error("timed out after {0:?} waiting for the retry chain to complete")]
    TimedOut(Duration),

    /// The outcome was already moved out by an earlier `get` call
    #[error("outcome has already been retrieved from this handle")]
    Retrieved,
}

/// A failure reported by one attempt of an operation.
///
/// The tag decides what the task chain does next: a [`Retryable`] failure is
/// rescheduled while budget remains, a [`GiveUp`] terminates the chain
/// immediately regardless of remaining budget.
///
/// [`Retryable`]: AttemptError::Retryable
/// [`GiveUp`]: AttemptError::GiveUp
#[derive(Debug)]
pub enum AttemptError {
    /// The attempt failed but may be retried within the remaining budget.
    Retryable(anyhow::Error),

    /// The operation asks the chain to stop retrying regardless of the
    /// remaining budget.
    GiveUp {
        /// Optional description of why the operation gave up
        message: Option<String>,
        /// Optional underlying failure that triggered the give-up
        cause: Option<anyhow::Error>,
    },
}

impl AttemptError {
    /// Wrap a failure that should be retried while budget remains.
    pub fn retryable(cause: impl Into<anyhow::Error>) -> Self {
        AttemptError::Retryable(cause.into())
    }

    /// Give up with no further detail.
    pub fn give_up() -> Self {
        AttemptError::GiveUp {
            message: None,
            cause: None,
        }
    }

    /// Give up with a descriptive message.
    pub fn give_up_with(message: impl Into<String>) -> Self {
        AttemptError::GiveUp {
            message: Some(message.into()),
            cause: None,
        }
    }

    /// Give up because of an underlying failure.
    pub fn give_up_because(cause: impl Into<anyhow::Error>) -> Self {
        AttemptError::GiveUp {
            message: None,
            cause: Some(cause.into()),
        }
    }

    /// Whether this failure suppresses further retries.
    pub fn is_give_up(&self) -> bool {
        matches!(self, AttemptError::GiveUp { .. })
    }

    /// Whether this failure may be retried within the remaining budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Retryable(_))
    }

    /// The wrapped cause, if one was supplied.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            AttemptError::Retryable(cause) => Some(cause),
            AttemptError::GiveUp { cause, .. } => cause.as_ref(),
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Retryable(cause) => write!(f, "retryable failure: {cause}"),
            AttemptError::GiveUp { message, cause } => {
                write!(f, "gave up")?;
                if let Some(message) = message {
                    write!(f, ": {message}")?;
                }
                if let Some(cause) = cause {
                    write!(f, " (caused by {cause})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Retryable(cause) => Some(cause.as_ref()),
            AttemptError::GiveUp {
                cause: Some(cause), ..
            } => Some(cause.as_ref()),
            AttemptError::GiveUp { cause: None, .. } => None,
        }
    }
}

impl From<anyhow::Error> for AttemptError {
    fn from(cause: anyhow::Error) -> Self {
        AttemptError::Retryable(cause)
    }
}
