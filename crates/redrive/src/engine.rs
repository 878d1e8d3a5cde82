//! Engine lifecycle and submission entry point

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::runtime::Runtime;

use crate::error::{ConfigError, EngineError};
use crate::executor::{DelayedExecutor, TokioDelayedExecutor};
use crate::handle::RetryHandle;
use crate::observer::{NoOpObserver, RetryObserver};
use crate::operation::Operation;
use crate::strategies::DelayStrategy;
use crate::task::{RetryTask, TaskConfig};

/// The configured capability, plus the pool the engine owns when it
/// created one itself.
struct EngineCore {
    executor: Arc<dyn DelayedExecutor>,
    owned_pool: Option<Runtime>,
}

/// Entry point for submitting retryable operations.
///
/// An engine owns (or borrows) a delayed-executor capability and wires each
/// submission into a fresh task chain and [`RetryHandle`]. The capability is
/// configured explicitly: [`init_pool`](RetryEngine::init_pool) starts an
/// engine-owned worker pool, [`init_with`](RetryEngine::init_with) adopts an
/// external capability whose lifecycle stays with the caller.
/// [`shutdown`](RetryEngine::shutdown) releases only an engine-owned pool
/// and returns the engine to the uninitialized state.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use redrive::{AttemptError, Exponential, FnOperation, RetryEngine};
///
/// fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = RetryEngine::with_pool(4)?;
///     let handle = engine.submit(
///         FnOperation::new(|attempt| async move {
///             if attempt < 3 {
///                 Err(AttemptError::retryable(anyhow::anyhow!("still flaky")))
///             } else {
///                 Ok("reached")
///             }
///         }),
///         Exponential::new(Duration::from_millis(100), 2.0)?,
///         5,
///     )?;
///     // ... later, from an async context: handle.get().await
///     engine.shutdown();
///     Ok(())
/// }
/// ```
pub struct RetryEngine {
    core: Mutex<Option<EngineCore>>,
}

impl RetryEngine {
    /// An engine with no delayed-executor capability configured yet.
    pub fn new() -> Self {
        Self {
            core: Mutex::new(None),
        }
    }

    /// Create an engine that owns a worker pool of `pool_size` threads.
    pub fn with_pool(pool_size: usize) -> Result<Self, EngineError> {
        let engine = Self::new();
        engine.init_pool(pool_size)?;
        Ok(engine)
    }

    /// Create an engine around an externally managed capability.
    pub fn with_executor(executor: Arc<dyn DelayedExecutor>) -> Result<Self, EngineError> {
        let engine = Self::new();
        engine.init_with(executor)?;
        Ok(engine)
    }

    fn lock(&self) -> MutexGuard<'_, Option<EngineCore>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start an engine-owned worker pool and make it the capability.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidPoolSize`] if `pool_size` is zero,
    /// [`EngineError::AlreadyInitialized`] if a capability is already
    /// configured, [`EngineError::PoolStart`] if the pool fails to start.
    pub fn init_pool(&self, pool_size: usize) -> Result<(), EngineError> {
        if pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize.into());
        }
        let mut core = self.lock();
        if core.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(pool_size)
            .thread_name("redrive-worker")
            .enable_all()
            .build()?;
        tracing::debug!(pool_size, "started retry worker pool");
        *core = Some(EngineCore {
            executor: Arc::new(TokioDelayedExecutor::new(runtime.handle().clone())),
            owned_pool: Some(runtime),
        });
        Ok(())
    }

    /// Adopt an externally supplied capability. The engine never shuts it
    /// down; its lifecycle stays with the caller.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyInitialized`] if a capability is already
    /// configured.
    pub fn init_with(&self, executor: Arc<dyn DelayedExecutor>) -> Result<(), EngineError> {
        let mut core = self.lock();
        if core.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        *core = Some(EngineCore {
            executor,
            owned_pool: None,
        });
        Ok(())
    }

    /// Whether a capability is currently configured.
    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Run `operation`, retrying failures per `strategy`, and return a
    /// handle for the eventual outcome.
    ///
    /// `max_attempts` is the retry budget: 0 means try exactly once and
    /// never retry; a negative value retries indefinitely until the
    /// operation succeeds or gives up; a positive `n` allows up to `n`
    /// retries after the first try.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotInitialized`] if no capability is configured.
    pub fn submit<O>(
        &self,
        operation: O,
        strategy: impl DelayStrategy + 'static,
        max_attempts: i32,
    ) -> Result<RetryHandle<O::Output>, EngineError>
    where
        O: Operation + 'static,
        O::Output: 'static,
    {
        self.submit_observed(operation, strategy, max_attempts, NoOpObserver)
    }

    /// As [`submit`](RetryEngine::submit), with an observer receiving the
    /// chain's attempt lifecycle events.
    pub fn submit_observed<O>(
        &self,
        operation: O,
        strategy: impl DelayStrategy + 'static,
        max_attempts: i32,
        observer: impl RetryObserver + 'static,
    ) -> Result<RetryHandle<O::Output>, EngineError>
    where
        O: Operation + 'static,
        O::Output: 'static,
    {
        let executor = {
            let core = self.lock();
            match core.as_ref() {
                Some(core) => Arc::clone(&core.executor),
                None => return Err(EngineError::NotInitialized),
            }
        };
        let handle = RetryHandle::new();
        let config = Arc::new(TaskConfig {
            operation: Arc::new(operation),
            handle: handle.clone(),
            strategy: Arc::new(strategy),
            max_attempts,
            executor: Arc::clone(&executor),
            observer: Arc::new(observer),
            started: Instant::now(),
        });
        let scheduled = executor.schedule_now(RetryTask::new(config, 0).run());
        handle.register_pending(scheduled);
        Ok(handle)
    }

    /// Release the capability. An engine-owned pool is shut down in the
    /// background (work still queued on it is dropped); an external
    /// capability is merely dropped, never shut down. The engine is
    /// uninitialized afterwards and may be initialized again.
    pub fn shutdown(&self) {
        let core = self.lock().take();
        if let Some(core) = core {
            if let Some(pool) = core.owned_pool {
                tracing::debug!("shutting down retry worker pool");
                pool.shutdown_background();
            }
        }
    }
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RetryEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
