//! Task lifecycle and outcome types.

use std::fmt;

use thiserror::Error;

/// Lifecycle state of a single task.
///
/// ```text
/// Pending -> Running -> { Completed | Cancelled | Failed }
/// Pending -> Cancelled            (cancel requested before the first poll)
/// ```
///
/// The three right-hand states are terminal: once reached, the state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Terminal state implied by a resolved outcome.
    #[must_use]
    pub fn settled<T>(outcome: &TaskOutcome<T>) -> Self {
        match outcome {
            Ok(_) => Self::Completed,
            Err(err) if err.is_cancelled() => Self::Cancelled,
            Err(_) => Self::Failed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task did not produce a value.
///
/// `Cancelled` is a cooperative stop, not a failure. Callers must check
/// [`TaskError::is_cancelled`] before reporting an error to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Failed(String),
    #[error("task runtime is not running")]
    RuntimeUnavailable,
}

impl TaskError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result of awaiting a task: its value, or the reason it has none.
pub type TaskOutcome<T> = Result<T, TaskError>;
