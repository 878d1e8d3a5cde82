//! Terminal outcome of a retry chain

use std::fmt;

use crate::error::AttemptError;

/// The final result of running an operation, after possibly retrying one or
/// more times.
///
/// Exactly one outcome is produced per submitted chain. The success/failure
/// state and the error are carried together in a `Result`, so an outcome can
/// never hold both a value and an error, and a failed outcome always holds
/// an error.
#[derive(Debug)]
pub struct ExecutionOutcome<T> {
    result: Result<T, AttemptError>,
    attempts: u32,
}

impl<T> ExecutionOutcome<T> {
    /// Record a success.
    ///
    /// `attempts` is the number of retries that were performed before the
    /// operation succeeded; zero means it succeeded on the first try.
    pub fn success(value: T, attempts: u32) -> Self {
        Self {
            result: Ok(value),
            attempts,
        }
    }

    /// Record a failure.
    ///
    /// `attempts` is the number of retries that were performed before the
    /// chain stopped; zero means it failed on the first try and was never
    /// retried.
    pub fn failure(error: AttemptError, attempts: u32) -> Self {
        Self {
            result: Err(error),
            attempts,
        }
    }

    /// Whether the operation eventually succeeded.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// How many retries were performed. Zero means the outcome was decided
    /// on the first try.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The success value, if the operation succeeded.
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// The error from the last attempt, if the operation failed.
    pub fn error(&self) -> Option<&AttemptError> {
        self.result.as_ref().err()
    }

    /// Consume the outcome, yielding the underlying result.
    pub fn into_result(self) -> Result<T, AttemptError> {
        self.result
    }

    /// Consume the outcome, yielding the success value if there is one.
    pub fn into_value(self) -> Option<T> {
        self.result.ok()
    }
}

impl<T: fmt::Debug> fmt::Display for ExecutionOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(value) => write!(
                f,
                "success after {} retries, result: {:?}",
                self.attempts, value
            ),
            Err(error) => write!(f, "failure after {} retries: {}", self.attempts, error),
        }
    }
}
