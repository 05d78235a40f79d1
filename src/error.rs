use core::any::Any;

use thiserror::Error;

/// Errors reported by containers, hierarchical locks and futures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A non-blocking pop found the container empty.
    #[error("container is empty")]
    ContainerEmpty,

    /// A hierarchical lock was requested out of strictly decreasing level order.
    #[error("lock hierarchy violated: cannot acquire level {requested} while holding level {held}")]
    HierarchyViolation {
        /// Lowest level currently held by the calling thread.
        held: u64,
        /// Level of the lock that was requested.
        requested: u64,
    },

    /// The future was resolved a second time.
    #[error("future is already resolved")]
    AlreadyResolved,

    /// The value of the future was already taken by an earlier `get`.
    #[error("result was already retrieved")]
    ResultAlreadyRetrieved,

    /// The producing side went away without resolving the future.
    #[error("task was abandoned without resolving its future")]
    BrokenTask {
        /// Why the producer went away, when known.
        cause: Option<TaskFailure>,
    },

    /// The task body failed; this is its original failure.
    #[error("task failed: {0}")]
    TaskFailed(#[from] TaskFailure),
}

/// Result type of this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Why a task body failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    /// Creates a failure with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Turns a panic payload caught with `catch_unwind` into a failure.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            format!("task panicked: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("task panicked: {s}")
        } else {
            "task panicked".to_string()
        };
        Self { message }
    }

    /// Description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}
