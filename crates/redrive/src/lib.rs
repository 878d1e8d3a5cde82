//! Retry-with-backoff execution engine
//!
//! Submit a fallible operation together with a delay strategy and a retry
//! budget; get back a [`RetryHandle`] that can be awaited, polled with a
//! timeout, or cancelled. Each failed attempt is rescheduled onto a
//! delayed-executor capability after the strategy's delay, as a chain of
//! single-attempt tasks with at most one unit of work outstanding per
//! handle.
//!
//! # Features
//!
//! - Delay strategies: [`Immediate`], [`Fixed`], uniform [`Random`], and
//!   [`Exponential`] backoff
//! - Bounded or unbounded retry budgets, with a distinguished
//!   [give-up](AttemptError::GiveUp) error that stops the chain regardless
//!   of remaining budget
//! - Cooperative cancellation that interrupts a pending delay or an
//!   in-flight attempt, with a well-defined completion/cancel race
//! - Observable attempts via [`RetryObserver`], including structured
//!   logging with [`TracingObserver`]
//! - Pluggable [`DelayedExecutor`] capability; Tokio-backed by default,
//!   either engine-owned ([`RetryEngine::with_pool`]) or borrowed from the
//!   surrounding runtime ([`TokioDelayedExecutor::current`])
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use redrive::{AttemptError, Fixed, FnOperation, RetryEngine, TokioDelayedExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RetryEngine::with_executor(Arc::new(TokioDelayedExecutor::current()))?;
//!
//! let handle = engine.submit(
//!     FnOperation::new(|attempt| async move {
//!         if attempt < 2 {
//!             Err(AttemptError::retryable(std::io::Error::other("flaky")))
//!         } else {
//!             Ok("done")
//!         }
//!     }),
//!     Fixed::new(Duration::from_millis(50)),
//!     5,
//! )?;
//!
//! let outcome = handle.get().await?;
//! assert!(outcome.succeeded());
//! assert_eq!(outcome.attempts(), 2);
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod executor;
mod handle;
mod observer;
mod operation;
mod outcome;
mod strategies;
mod task;

pub use engine::RetryEngine;
pub use error::{AttemptError, ConfigError, EngineError, WaitError};
pub use executor::{DelayedExecutor, ScheduledRef, TokioDelayedExecutor, WorkItem};
pub use handle::RetryHandle;
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use operation::{FnOperation, Operation};
pub use outcome::ExecutionOutcome;
pub use strategies::{DelayStrategy, Exponential, Fixed, Immediate, Random};
