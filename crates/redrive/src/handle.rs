//! The caller-facing handle for an in-progress retry chain
//!
//! A [`RetryHandle`] is created empty by
//! [`RetryEngine::submit`](crate::RetryEngine::submit) and transitions
//! exactly once to one of two terminal states: completed with an
//! [`ExecutionOutcome`], or cancelled. The task chain is the only writer of
//! the completed state; `cancel` may be called from any context at any
//! time. All state lives under a single lock, so a cancel racing a
//! completion has exactly one winner.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::WaitError;
use crate::executor::ScheduledRef;
use crate::outcome::ExecutionOutcome;

enum Terminal<T> {
    /// The chain produced an outcome; the slot is `None` once the outcome
    /// has been handed out to a caller.
    Completed(Option<ExecutionOutcome<T>>),
    Cancelled,
}

struct State<T> {
    terminal: Option<Terminal<T>>,
    /// The single in-flight attempt or scheduled resubmission, swapped each
    /// time the chain schedules new work.
    pending: Option<ScheduledRef>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    done: Notify,
}

/// Handle to an in-progress or completed retry chain.
///
/// Cloning is cheap; clones observe the same chain. The outcome itself is
/// moved out to the first successful [`get`](RetryHandle::get) caller.
pub struct RetryHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RetryHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> RetryHandle<T> {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    terminal: None,
                    pending: None,
                }),
                done: Notify::new(),
            }),
        }
    }

    // state transitions are single-assignment, so a poisoned lock cannot
    // expose a torn write
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until the chain reaches a terminal state and take its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Cancelled`] if the chain was cancelled — a
    /// cancelled handle never yields an outcome — or
    /// [`WaitError::Retrieved`] if an earlier `get` already moved the
    /// outcome out.
    pub async fn get(&self) -> Result<ExecutionOutcome<T>, WaitError> {
        loop {
            // register interest before checking, so a completion landing
            // between the check and the await still wakes us
            let notified = self.shared.done.notified();
            {
                let mut state = self.lock();
                match &mut state.terminal {
                    Some(Terminal::Cancelled) => return Err(WaitError::Cancelled),
                    Some(Terminal::Completed(slot)) => {
                        return slot.take().ok_or(WaitError::Retrieved)
                    }
                    None => {}
                }
            }
            notified.await;
        }
    }

    /// Wait at most `timeout` for the chain to complete.
    ///
    /// On expiry the handle is left untouched and the chain keeps running;
    /// waiting again later is allowed. If completion is observed before the
    /// timeout elapses, the outcome is returned.
    ///
    /// # Errors
    ///
    /// As [`get`](RetryHandle::get), plus [`WaitError::TimedOut`] on expiry.
    pub async fn get_timeout(&self, timeout: Duration) -> Result<ExecutionOutcome<T>, WaitError> {
        match tokio::time::timeout(timeout, self.get()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(WaitError::TimedOut(timeout)),
        }
    }

    /// Cancel the retry chain.
    ///
    /// Marks the handle cancelled and cancels the currently pending unit of
    /// work: a scheduled resubmission will never run, and an in-flight
    /// attempt is interrupted best-effort at its next await point.
    ///
    /// Returns `false` if the chain had already reached a terminal state —
    /// including when a completion wins the race against this call — and
    /// `true` otherwise. Only the first successful call returns `true`.
    pub fn cancel(&self) -> bool {
        let pending = {
            let mut state = self.lock();
            if state.terminal.is_some() {
                return false;
            }
            state.terminal = Some(Terminal::Cancelled);
            state.pending.take()
        };
        if let Some(scheduled) = pending {
            scheduled.cancel();
        }
        self.shared.done.notify_waiters();
        true
    }

    /// Whether the chain has reached a terminal state (completed or
    /// cancelled).
    pub fn is_done(&self) -> bool {
        self.lock().terminal.is_some()
    }

    /// Whether the chain was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(&self.lock().terminal, Some(Terminal::Cancelled))
    }

    /// Record the chain's outcome. Called exactly once by the task chain.
    ///
    /// A completion that arrives after a cancel lost the race and is
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics on a second completion; that would mean two tasks were live
    /// for one handle, which the chain never allows.
    pub(crate) fn complete(&self, outcome: ExecutionOutcome<T>) {
        {
            let mut state = self.lock();
            match state.terminal {
                Some(Terminal::Cancelled) => {
                    tracing::debug!("retry outcome discarded, handle was already cancelled");
                    return;
                }
                Some(Terminal::Completed(_)) => panic!("retry handle completed twice"),
                None => {
                    state.terminal = Some(Terminal::Completed(Some(outcome)));
                    state.pending = None;
                }
            }
        }
        self.shared.done.notify_waiters();
    }

    /// Register the currently pending unit of work so a later cancel can
    /// interrupt it. If the handle is already terminal the work is
    /// cancelled on the spot instead of registered.
    pub(crate) fn register_pending(&self, scheduled: ScheduledRef) {
        let stale = {
            let mut state = self.lock();
            if state.terminal.is_some() {
                Some(scheduled)
            } else {
                state.pending = Some(scheduled);
                None
            }
        };
        if let Some(scheduled) = stale {
            scheduled.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptError;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_get_returns_completed_outcome() {
        let handle: RetryHandle<&str> = RetryHandle::new();
        handle.complete(ExecutionOutcome::success("hello", 0));

        let outcome = handle.get().await.unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.value(), Some(&"hello"));
        assert!(handle.is_done());
        assert!(!handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_get_waits_for_completion() {
        let handle: RetryHandle<u32> = RetryHandle::new();
        let waiter = handle.clone();

        let join = tokio::spawn(async move { waiter.get().await });
        tokio::task::yield_now().await;
        handle.complete(ExecutionOutcome::success(7, 1));

        let outcome = join.await.unwrap().unwrap();
        assert_eq!(outcome.value(), Some(&7));
        assert_eq!(outcome.attempts(), 1);
    }

    #[tokio::test]
    async fn test_second_get_reports_retrieved() {
        let handle: RetryHandle<u32> = RetryHandle::new();
        handle.complete(ExecutionOutcome::success(1, 0));

        assert!(handle.get().await.is_ok());
        assert_eq!(handle.get().await.unwrap_err(), WaitError::Retrieved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_timeout_expires_without_cancelling() {
        let handle: RetryHandle<u32> = RetryHandle::new();

        let result = handle.get_timeout(Duration::from_millis(100)).await;
        assert_eq!(
            result.unwrap_err(),
            WaitError::TimedOut(Duration::from_millis(100))
        );
        assert!(!handle.is_done());
        assert!(!handle.is_cancelled());

        // the chain can still complete and be observed afterwards
        handle.complete(ExecutionOutcome::success(9, 2));
        let outcome = handle.get_timeout(Duration::from_millis(100)).await.unwrap();
        assert_eq!(outcome.value(), Some(&9));
    }

    #[tokio::test]
    async fn test_cancel_before_completion() {
        let handle: RetryHandle<u32> = RetryHandle::new();

        assert!(handle.cancel());
        assert!(handle.is_done());
        assert!(handle.is_cancelled());
        assert_eq!(handle.get().await.unwrap_err(), WaitError::Cancelled);

        // idempotent after the first successful cancel
        assert!(!handle.cancel());
    }

    #[tokio::test]
    async fn test_cancel_after_completion_returns_false() {
        let handle: RetryHandle<u32> = RetryHandle::new();
        handle.complete(ExecutionOutcome::success(1, 0));

        assert!(!handle.cancel());
        assert!(!handle.is_cancelled());
        assert!(handle.get().await.is_ok());
    }

    #[tokio::test]
    async fn test_completion_after_cancel_is_discarded() {
        let handle: RetryHandle<u32> = RetryHandle::new();

        assert!(handle.cancel());
        handle.complete(ExecutionOutcome::success(1, 0));

        assert!(handle.is_cancelled());
        assert_eq!(handle.get().await.unwrap_err(), WaitError::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_fires_pending_work() {
        let handle: RetryHandle<u32> = RetryHandle::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        handle.register_pending(ScheduledRef::new(move || {
            flag.store(true, Ordering::SeqCst);
            true
        }));

        assert!(handle.cancel());
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_register_after_terminal_cancels_immediately() {
        let handle: RetryHandle<u32> = RetryHandle::new();
        handle.cancel();

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        handle.register_pending(ScheduledRef::new(move || {
            flag.store(true, Ordering::SeqCst);
            true
        }));

        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    #[should_panic(expected = "completed twice")]
    async fn test_double_completion_panics() {
        let handle: RetryHandle<u32> = RetryHandle::new();
        handle.complete(ExecutionOutcome::success(1, 0));
        handle.complete(ExecutionOutcome::failure(AttemptError::give_up(), 0));
    }
}
