//! Task state machine

use serde::{Deserialize, Serialize};

/// Possible states of a task
///
/// Transitions are monotonic: `Pending -> Running -> {Completed, Failed,
/// Canceled}`, plus direct cancellation of a task that never started
/// (`Pending -> Canceled`). The three successors are terminal; nothing
/// leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task is created and waiting for its pipeline to start
    Pending,

    /// Task is currently being processed by its pipeline
    Running,

    /// Task completed successfully and has a result artifact
    Completed,

    /// Task failed with an error recorded in its log
    Failed,

    /// Task was cancelled before producing a result
    Canceled,
}

impl TaskStatus {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    /// Check if the task is currently running
    pub fn is_running(&self) -> bool {
        matches!(self, TaskStatus::Running)
    }

    /// Check if the task has not started yet
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }

    /// Check whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (*self, next) {
            (TaskStatus::Pending, TaskStatus::Running) => true,
            (TaskStatus::Pending, TaskStatus::Canceled) => true,
            (TaskStatus::Running, TaskStatus::Completed) => true,
            (TaskStatus::Running, TaskStatus::Failed) => true,
            (TaskStatus::Running, TaskStatus::Canceled) => true,
            _ => false,
        }
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Running => "Running",
            TaskStatus::Completed => "Completed",
            TaskStatus::Failed => "Failed",
            TaskStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
