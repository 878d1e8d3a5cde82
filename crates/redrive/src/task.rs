//! The per-attempt state machine
//!
//! One [`RetryTask`] performs exactly one attempt. It classifies the result
//! and either completes the handle or constructs its successor and hands it
//! to the delayed-executor capability, forming a self-perpetuating chain
//! with at most one task scheduled or running per handle at any time.

use std::sync::Arc;
use std::time::Instant;

use crate::executor::{DelayedExecutor, WorkItem};
use crate::handle::RetryHandle;
use crate::observer::RetryObserver;
use crate::operation::Operation;
use crate::outcome::ExecutionOutcome;
use crate::strategies::DelayStrategy;

/// Immutable configuration shared by every task in one retry chain.
pub(crate) struct TaskConfig<T> {
    pub(crate) operation: Arc<dyn Operation<Output = T>>,
    pub(crate) handle: RetryHandle<T>,
    pub(crate) strategy: Arc<dyn DelayStrategy>,
    /// 0 = try once only; negative = unbounded retries
    pub(crate) max_attempts: i32,
    pub(crate) executor: Arc<dyn DelayedExecutor>,
    pub(crate) observer: Arc<dyn RetryObserver>,
    pub(crate) started: Instant,
}

/// One attempt of a retry chain, at a fixed attempt index.
pub(crate) struct RetryTask<T> {
    config: Arc<TaskConfig<T>>,
    attempt: u32,
}

impl<T: Send + 'static> RetryTask<T> {
    pub(crate) fn new(config: Arc<TaskConfig<T>>, attempt: u32) -> Self {
        Self { config, attempt }
    }

    /// Run the attempt as a type-erased work item.
    pub(crate) fn run(self) -> WorkItem {
        Box::pin(async move {
            let Self { config, attempt } = self;

            if config.handle.is_cancelled() {
                // normally unreachable: cancellation also cancels scheduled
                // work, but a cancel can land between scheduling and
                // registration
                config.observer.on_cancelled(attempt);
                return;
            }

            config.observer.on_attempt_start(attempt, config.max_attempts);
            match config.operation.attempt(attempt).await {
                Ok(value) => {
                    config.observer.on_success(attempt, config.started.elapsed());
                    config
                        .handle
                        .complete(ExecutionOutcome::success(value, attempt));
                }
                Err(error) if error.is_give_up() => {
                    config.observer.on_gave_up(attempt, &error);
                    config
                        .handle
                        .complete(ExecutionOutcome::failure(error, attempt));
                }
                Err(error) => {
                    let can_retry =
                        config.max_attempts < 0 || attempt < config.max_attempts as u32;
                    if can_retry {
                        let delay = config.strategy.next_delay(attempt);
                        config.observer.on_attempt_failed(attempt, &error, delay);
                        let next = RetryTask::new(Arc::clone(&config), attempt + 1);
                        let scheduled = config.executor.schedule_after(delay, next.run());
                        config.handle.register_pending(scheduled);
                    } else {
                        config.observer.on_exhausted(attempt, &error);
                        config
                            .handle
                            .complete(ExecutionOutcome::failure(error, attempt));
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptError;
    use crate::executor::ScheduledRef;
    use crate::observer::{NoOpObserver, StatsObserver};
    use crate::operation::FnOperation;
    use crate::strategies::{Fixed, Immediate};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records schedule calls without ever running the work, standing in
    /// for the worker pool so one task run can be observed in isolation.
    #[derive(Default)]
    struct RecordingExecutor {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingExecutor {
        fn scheduled(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    impl DelayedExecutor for RecordingExecutor {
        fn schedule_now(&self, _work: WorkItem) -> ScheduledRef {
            self.delays.lock().unwrap().push(Duration::ZERO);
            ScheduledRef::new(|| false)
        }

        fn schedule_after(&self, delay: Duration, _work: WorkItem) -> ScheduledRef {
            self.delays.lock().unwrap().push(delay);
            ScheduledRef::new(|| false)
        }
    }

    struct Chain {
        config: Arc<TaskConfig<&'static str>>,
        executor: Arc<RecordingExecutor>,
        invocations: Arc<AtomicU32>,
    }

    fn chain<F, Fut>(max_attempts: i32, strategy: impl DelayStrategy + 'static, op: F) -> Chain
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<&'static str, AttemptError>> + Send + 'static,
    {
        let executor = Arc::new(RecordingExecutor::default());
        let invocations = Arc::new(AtomicU32::new(0));
        let counter = invocations.clone();
        let config = Arc::new(TaskConfig {
            operation: Arc::new(FnOperation::new(move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                op(attempt)
            })),
            handle: RetryHandle::new(),
            strategy: Arc::new(strategy),
            max_attempts,
            executor: executor.clone(),
            observer: Arc::new(NoOpObserver),
            started: Instant::now(),
        });
        Chain {
            config,
            executor,
            invocations,
        }
    }

    #[tokio::test]
    async fn test_success_completes_the_handle() {
        let chain = chain(5, Immediate, |_| async { Ok("hello") });

        RetryTask::new(chain.config.clone(), 0).run().await;

        let outcome = chain.config.handle.get().await.unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.value(), Some(&"hello"));
        assert_eq!(outcome.attempts(), 0);
        assert!(chain.executor.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_failure_schedules_a_retry() {
        let chain = chain(5, Immediate, |_| async {
            Err(AttemptError::retryable(anyhow::anyhow!("yelp!")))
        });

        RetryTask::new(chain.config.clone(), 0).run().await;

        assert!(!chain.config.handle.is_done());
        assert_eq!(chain.executor.scheduled(), vec![Duration::ZERO]);
    }

    #[tokio::test]
    async fn test_give_up_completes_without_retrying() {
        let chain = chain(5, Immediate, |_| async {
            Err(AttemptError::give_up_with("hopeless"))
        });

        RetryTask::new(chain.config.clone(), 0).run().await;

        let outcome = chain.config.handle.get().await.unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.attempts(), 0);
        assert!(outcome.error().unwrap().is_give_up());
        assert!(chain.executor.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_success_on_the_last_retry() {
        let chain = chain(5, Immediate, |_| async { Ok("hello") });

        RetryTask::new(chain.config.clone(), 5).run().await;

        let outcome = chain.config.handle.get().await.unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.attempts(), 5);
        assert!(chain.executor.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_failure_on_the_last_retry_completes() {
        let chain = chain(5, Immediate, |_| async {
            Err(AttemptError::retryable(anyhow::anyhow!("yelp!")))
        });

        RetryTask::new(chain.config.clone(), 5).run().await;

        let outcome = chain.config.handle.get().await.unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.attempts(), 5);
        assert!(chain.executor.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_uses_the_strategy_delay() {
        let chain = chain(5, Fixed::new(Duration::from_millis(300)), |_| async {
            Err(AttemptError::retryable(anyhow::anyhow!("yelp!")))
        });

        RetryTask::new(chain.config.clone(), 3).run().await;

        assert_eq!(chain.executor.scheduled(), vec![Duration::from_millis(300)]);
    }

    #[tokio::test]
    async fn test_zero_budget_never_retries() {
        let chain = chain(0, Immediate, |_| async {
            Err(AttemptError::retryable(anyhow::anyhow!("yelp!")))
        });

        RetryTask::new(chain.config.clone(), 0).run().await;

        let outcome = chain.config.handle.get().await.unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.attempts(), 0);
        assert!(chain.executor.scheduled().is_empty());
        assert_eq!(chain.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_budget_always_retries() {
        let chain = chain(-123, Immediate, |_| async {
            Err(AttemptError::retryable(anyhow::anyhow!("yelp!")))
        });

        RetryTask::new(chain.config.clone(), 10_000).run().await;

        assert!(!chain.config.handle.is_done());
        assert_eq!(chain.executor.scheduled(), vec![Duration::ZERO]);
    }

    #[tokio::test]
    async fn test_cancelled_handle_skips_the_attempt() {
        let observer = Arc::new(StatsObserver::new());
        let chain = chain(5, Immediate, |_| async { Ok("hello") });
        let config = Arc::new(TaskConfig {
            observer: observer.clone(),
            operation: chain.config.operation.clone(),
            handle: chain.config.handle.clone(),
            strategy: chain.config.strategy.clone(),
            max_attempts: chain.config.max_attempts,
            executor: chain.config.executor.clone(),
            started: chain.config.started,
        });
        config.handle.cancel();

        RetryTask::new(config, 0).run().await;

        assert_eq!(chain.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(observer.cancellations(), 1);
        assert_eq!(observer.attempt_starts(), 0);
    }
}
