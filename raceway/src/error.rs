use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// The terminal result of a unit of work.
///
/// A unit of work ends in exactly one `Outcome`. Cancellation is not an
/// outcome: a canceled unit of work simply never produces one.
pub type Outcome<A> = Result<A, TaskError>;

/// Failure produced by a unit of work or by a timer branch.
///
/// The error is cheap to clone so that a single failure can be mirrored to
/// every joiner of a [`Fiber`](crate::task::Fiber).
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// Synthetic failure raised by a timer branch once its duration elapsed.
    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    /// Failure described by a plain message.
    #[error("{0}")]
    Message(String),

    /// Failure wrapping an arbitrary error value.
    #[error(transparent)]
    Custom(Arc<dyn StdError + Send + Sync>),
}

impl TaskError {
    /// Creates a failure from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Message(message.into())
    }

    /// Wraps any error type as a task failure.
    pub fn custom<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        TaskError::Custom(Arc::new(error))
    }

    /// Returns `true` if this failure was raised by a timer branch.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout(_))
    }
}
