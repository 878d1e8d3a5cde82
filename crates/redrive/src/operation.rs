//! The caller-supplied operation capability

use std::future::Future;

use async_trait::async_trait;

use crate::error::AttemptError;

/// A fallible operation that the engine may invoke repeatedly.
///
/// The chain shares one operation instance by reference across all attempts,
/// so implementations that keep state between attempts must use interior
/// mutability and be thread-safe. The engine itself treats the operation as
/// stateless.
///
/// Operations are expected to be idempotent by contract: the engine may run
/// them more than once.
#[async_trait]
pub trait Operation: Send + Sync {
    /// The value produced by a successful attempt.
    type Output: Send;

    /// Run one attempt.
    ///
    /// `attempt_index` is 0 on the first try, 1 on the first retry, and so
    /// on. Return `Ok` on success, a [`AttemptError::Retryable`] failure to
    /// request a retry within the remaining budget, or a
    /// [`AttemptError::GiveUp`] to stop the chain immediately.
    async fn attempt(&self, attempt_index: u32) -> Result<Self::Output, AttemptError>;
}

/// Adapts a closure returning a future into an [`Operation`].
///
/// # Example
///
/// ```rust
/// use redrive::{AttemptError, FnOperation};
///
/// let operation = FnOperation::new(|attempt: u32| async move {
///     if attempt < 1 {
///         Err(AttemptError::retryable(anyhow::anyhow!("not yet")))
///     } else {
///         Ok(attempt)
///     }
/// });
/// ```
pub struct FnOperation<F> {
    f: F,
}

impl<F> FnOperation<F> {
    /// Wrap a closure of the shape `Fn(attempt_index) -> Future<Output =
    /// Result<T, AttemptError>>`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, T> Operation for FnOperation<F>
where
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, AttemptError>> + Send,
    T: Send,
{
    type Output = T;

    async fn attempt(&self, attempt_index: u32) -> Result<T, AttemptError> {
        (self.f)(attempt_index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_operation_passes_attempt_index() {
        let operation = FnOperation::new(|attempt| async move { Ok::<_, AttemptError>(attempt) });

        assert_eq!(operation.attempt(0).await.unwrap(), 0);
        assert_eq!(operation.attempt(7).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_fn_operation_propagates_failure() {
        let operation = FnOperation::new(|_attempt| async move {
            Err::<(), _>(AttemptError::give_up_with("nope"))
        });

        let err = operation.attempt(0).await.unwrap_err();
        assert!(err.is_give_up());
    }
}
