use crate::task::TaskId;
use thiserror::Error;

/// Errors returned by schedule operations. A failed operation leaves the
/// schedule exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("task {task} not found")]
    NotFound { task: TaskId },

    #[error("task {successor} does not depend on task {predecessor}")]
    DependencyNotFound {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error(
        "linking {predecessor} -> {successor} would create a circular dependency \
         ({predecessor} already depends on {successor})"
    )]
    CycleDetected {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("task {task} has changed (expected version {expected}, found {actual})")]
    Conflict {
        task: TaskId,
        expected: u64,
        actual: u64,
    },
}

impl ScheduleError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ScheduleError::InvalidInput(message.into())
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduleError::InvalidInput(_) => "invalid_input",
            ScheduleError::NotFound { .. } | ScheduleError::DependencyNotFound { .. } => {
                "not_found"
            }
            ScheduleError::CycleDetected { .. } => "cycle_detected",
            ScheduleError::Conflict { .. } => "conflict",
        }
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
