//! The delayed-executor capability
//!
//! The engine never talks to a scheduler directly; it goes through
//! [`DelayedExecutor`], which runs a work item immediately or after a delay
//! and hands back a cancellable [`ScheduledRef`]. Implementations must
//! guarantee that cancelling a reference prevents a not-yet-started work
//! item from running, and best-effort-interrupts one that is already
//! running.
//!
//! [`TokioDelayedExecutor`] is the production implementation, backed by a
//! Tokio runtime handle: delays are `tokio::time::sleep` and cancellation is
//! task abort, which lands either on the pending sleep or on the running
//! work item's next await point.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// A unit of work handed to a [`DelayedExecutor`].
pub type WorkItem = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Capability that runs work items on a worker pool, now or after a delay.
pub trait DelayedExecutor: Send + Sync {
    /// Run the work item as soon as a worker is available.
    fn schedule_now(&self, work: WorkItem) -> ScheduledRef;

    /// Run the work item once `delay` has elapsed.
    fn schedule_after(&self, delay: Duration, work: WorkItem) -> ScheduledRef;
}

/// Cancellable reference to a scheduled work item.
pub struct ScheduledRef {
    cancel: Box<dyn Fn() -> bool + Send + Sync>,
}

impl ScheduledRef {
    /// Wrap a cancellation callback for a custom [`DelayedExecutor`].
    ///
    /// The callback returns whether the work item was actually cancelled;
    /// it must return `false` if the work item had already finished.
    pub fn new(cancel: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Build a reference that cancels by aborting a spawned Tokio task.
    pub fn from_abort_handle(handle: AbortHandle) -> Self {
        Self::new(move || {
            if handle.is_finished() {
                return false;
            }
            handle.abort();
            true
        })
    }

    /// Cancel the work item: prevent it from starting, or interrupt it
    /// best-effort if it is already running. Returns `false` if it had
    /// already finished.
    pub fn cancel(&self) -> bool {
        (self.cancel)()
    }
}

/// [`DelayedExecutor`] backed by a Tokio runtime.
#[derive(Clone)]
pub struct TokioDelayedExecutor {
    handle: Handle,
}

impl TokioDelayedExecutor {
    /// Schedule work onto the runtime behind the given handle.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Schedule work onto the runtime the caller is currently inside.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a Tokio runtime context.
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }
}

impl DelayedExecutor for TokioDelayedExecutor {
    fn schedule_now(&self, work: WorkItem) -> ScheduledRef {
        ScheduledRef::from_abort_handle(self.handle.spawn(work).abort_handle())
    }

    fn schedule_after(&self, delay: Duration, work: WorkItem) -> ScheduledRef {
        let join = self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            work.await;
        });
        ScheduledRef::from_abort_handle(join.abort_handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_schedule_now_runs_work() {
        let executor = TokioDelayedExecutor::current();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        executor.schedule_now(Box::pin(async move {
            flag.store(true, Ordering::SeqCst);
        }));

        tokio::task::yield_now().await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_after_waits_for_delay() {
        let executor = TokioDelayedExecutor::current();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        executor.schedule_after(
            Duration::from_millis(500),
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!ran.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_pending_work() {
        let executor = TokioDelayedExecutor::current();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        let scheduled = executor.schedule_after(
            Duration::from_millis(500),
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(scheduled.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_after_finish_returns_false() {
        let executor = TokioDelayedExecutor::current();

        let scheduled = executor.schedule_now(Box::pin(async {}));
        // let the work item run to completion
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(!scheduled.cancel());
    }
}
