//! Task Registry - the single source of truth for task state
//!
//! Owns the task-id -> record map and the task-id -> execution-handle map.
//! Every mutation goes through the registry; callers only ever observe
//! point-in-time snapshots. All terminal transitions are check-and-set under
//! one write-lock acquisition, so at most one terminal transition wins when
//! completion and cancellation race.

use crate::handle::ExecutionHandle;
use crate::state::TaskStatus;
use crate::task::{LogEntry, TaskArtifact, TaskId, TaskParams, TaskRecord};
use ampliflow_foundation::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Task Registry - concurrent map of task records plus their execution
/// handles. Cheap to clone; clones share the same state.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    /// All task records by ID
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,

    /// Execution handles by task ID (at most one per task, ever)
    handles: Arc<Mutex<HashMap<TaskId, ExecutionHandle>>>,
}

impl TaskRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Record lifecycle
    // ========================================================================

    /// Create a new pending task and return its id
    pub async fn create(
        &self,
        owner_id: impl Into<String>,
        filename: impl Into<String>,
        params: TaskParams,
    ) -> TaskId {
        let mut record = TaskRecord::new(owner_id, filename, params);
        record.log.push(LogEntry::new("Task created"));
        let task_id = record.id;

        let mut tasks = self.tasks.write().await;
        tasks.insert(task_id, record);
        drop(tasks);

        info!("Created task {}", task_id);
        task_id
    }

    /// Get a point-in-time snapshot of a task
    pub async fn get(&self, task_id: &TaskId) -> Option<TaskRecord> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).cloned()
    }

    /// Apply a status transition, validating it against the state machine.
    ///
    /// The check and the write happen under a single lock hold: once a
    /// record is terminal, every further attempt gets `InvalidTransition`
    /// and the record is left untouched. Sets `started_at` on entry to
    /// Running and `finished_at` on entry to any terminal state.
    pub async fn set_status(&self, task_id: &TaskId, status: TaskStatus) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))?;

        if !record.status.can_transition_to(status) {
            let from = record.status;
            drop(tasks);
            debug!("Rejected transition {} -> {} for task {}", from, status, task_id);
            return Err(Error::invalid_transition(
                from.display_name(),
                status.display_name(),
            ));
        }

        record.status = status;
        let now = Utc::now();
        if status.is_running() {
            record.started_at = Some(now);
        }
        if status.is_terminal() {
            record.finished_at = Some(now);
        }
        record
            .log
            .push(LogEntry::new(format!("Status changed to {}", status)));

        trace!("Task {} is now {}", task_id, status);
        Ok(())
    }

    /// Append a timestamped log entry. A no-op for unknown ids, to tolerate
    /// races with concurrent cleanup.
    pub async fn add_log(&self, task_id: &TaskId, message: impl Into<String>) {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(record) => record.log.push(LogEntry::new(message)),
            None => trace!("Dropped log entry for unknown task {}", task_id),
        }
    }

    /// Attach the result artifact and complete the task, as one atomic
    /// operation.
    ///
    /// Requires the task to be Running with no prior result; the artifact,
    /// the Completed status and `finished_at` are written in the same lock
    /// hold. If a cancellation (or any other terminal transition) won the
    /// race first, this returns `InvalidTransition` and attaches nothing —
    /// which keeps `result.is_some()` equivalent to Completed at every
    /// observable point.
    pub async fn attach_result(
        &self,
        task_id: &TaskId,
        bytes: Vec<u8>,
        filename: impl Into<String>,
    ) -> Result<()> {
        let filename = filename.into();
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))?;

        if !record.status.can_transition_to(TaskStatus::Completed) || record.result.is_some() {
            let from = record.status;
            drop(tasks);
            debug!("Rejected result attach for task {} in state {}", task_id, from);
            return Err(Error::invalid_transition(
                from.display_name(),
                TaskStatus::Completed.display_name(),
            ));
        }

        record.result = Some(TaskArtifact::new(bytes, filename.clone()));
        record.status = TaskStatus::Completed;
        record.finished_at = Some(Utc::now());
        record
            .log
            .push(LogEntry::new(format!("Result attached: {}", filename)));

        info!("Task {} completed with artifact {}", task_id, filename);
        Ok(())
    }

    /// Snapshot all tasks for an owner whose params contain every filter
    /// key/value pair. No implied ordering; callers sort as needed.
    pub async fn list_for_owner(&self, owner_id: &str, filters: &TaskParams) -> Vec<TaskRecord> {
        let tasks = self.tasks.read().await;
        tasks
            .values()
            .filter(|t| t.owner_id == owner_id && t.matches_filters(filters))
            .cloned()
            .collect()
    }

    // ========================================================================
    // Handles & cancellation
    // ========================================================================

    /// Record the execution handle for a task. Exactly one handle may ever
    /// be registered per id; a second registration is a caller error.
    pub async fn register_handle(&self, task_id: TaskId, handle: ExecutionHandle) -> Result<()> {
        let mut handles = self.handles.lock().await;
        if handles.contains_key(&task_id) {
            return Err(Error::DuplicateSubmission(format!(
                "Task {} already submitted",
                task_id
            )));
        }
        handles.insert(task_id, handle);
        Ok(())
    }

    /// Request cancellation of a task and return its current status.
    ///
    /// Signals the live handle (cooperative - the pipeline observes the
    /// token at its own suspension points), then attempts the Canceled
    /// transition so a task with no started pipeline is still marked. On an
    /// already-terminal task this is a no-op that reports the unchanged
    /// status. Idempotent.
    pub async fn cancel(&self, task_id: &TaskId) -> Result<TaskStatus> {
        {
            let handles = self.handles.lock().await;
            if let Some(handle) = handles.get(task_id) {
                if !handle.is_finished() {
                    handle.cancel();
                    debug!("Signalled cancellation to task {}", task_id);
                }
            }
        }

        match self.set_status(task_id, TaskStatus::Canceled).await {
            Ok(()) => {
                info!("Cancelled task {}", task_id);
            }
            // Terminal already - the record keeps whatever state won
            Err(Error::InvalidTransition { .. }) => {}
            Err(e) => return Err(e),
        }

        self.get(task_id)
            .await
            .map(|t| t.status)
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))
    }

    /// Number of tasks with a live (unfinished) execution handle
    pub async fn live_handle_count(&self) -> usize {
        let handles = self.handles.lock().await;
        handles.values().filter(|h| !h.is_finished()).count()
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Signal cancellation to every live handle and await settlement for up
    /// to `grace`. Returns the number of pipelines that were abandoned
    /// because they did not settle in time.
    pub async fn drain(&self, grace: Duration) -> usize {
        let joins: Vec<(TaskId, JoinHandle<()>)> = {
            let mut handles = self.handles.lock().await;
            handles
                .iter_mut()
                .filter_map(|(id, handle)| {
                    handle.cancel();
                    handle.take_join().map(|join| (*id, join))
                })
                .collect()
        };

        if joins.is_empty() {
            return 0;
        }
        info!("Draining {} pipeline(s), grace {:?}", joins.len(), grace);

        let deadline = tokio::time::Instant::now() + grace;
        let mut abandoned = 0;
        for (task_id, join) in joins {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, join).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Pipeline for task {} panicked: {}", task_id, e),
                Err(_) => {
                    warn!("Abandoning pipeline for task {} after grace period", task_id);
                    abandoned += 1;
                }
            }
        }

        abandoned
    }
}
