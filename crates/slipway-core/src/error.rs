use thiserror::Error;

/// Errors returned by supervisor management calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("task already supervised: {0}")]
    DuplicateName(String),

    /// The task stays blocked until the missing names are registered.
    #[error("task {task} requires unregistered task(s): {}", .missing.join(", "))]
    DependencyUnsatisfiable { task: String, missing: Vec<String> },
}

/// Outcome of a single run of a work function.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("{reason}")]
    Fail { reason: String },

    #[error("panicked: {reason}")]
    Panicked { reason: String },

    /// Returned by work that stopped because it observed the shutdown signal.
    /// Never recorded as a failure.
    #[error("canceled")]
    Canceled,
}

impl TaskError {
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        TaskError::fail(e.to_string())
    }
}

/// Terminal error of a task, as reported by [`crate::Supervisor::run`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{task}: {error}")]
pub struct TaskFailure {
    pub task: String,
    pub error: TaskError,
}
