//! Execution pipeline - drives one task from Running to a terminal state
//!
//! The processing step is a placeholder: a sequence of named phases that
//! wait and log progress, standing in for the real analysis. Cancellation
//! is cooperative - the pipeline selects on its token at every suspension
//! point (phase waits, artifact rendering) and never unwinds preemptively.

use crate::notify::Notifier;
use crate::registry::TaskRegistry;
use crate::report::{fallback_artifact, ReportSink};
use crate::state::TaskStatus;
use crate::task::TaskId;
use ampliflow_foundation::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One simulated work phase
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    /// Progress message appended to the task log when the phase starts
    pub label: String,

    /// How long the phase takes
    pub duration: Duration,
}

impl PhaseSpec {
    pub fn new(label: impl Into<String>, duration: Duration) -> Self {
        Self {
            label: label.into(),
            duration,
        }
    }
}

/// Configuration for the execution pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Ordered simulated work phases
    pub phases: Vec<PhaseSpec>,
}

impl PipelineConfig {
    /// Replace the phase list
    pub fn with_phases(mut self, phases: Vec<PhaseSpec>) -> Self {
        self.phases = phases;
        self
    }

    /// Use `count` unlabeled phases of equal `duration` (test helper for
    /// pipelines that need predictable timing)
    pub fn with_uniform_phases(mut self, count: usize, duration: Duration) -> Self {
        self.phases = (1..=count)
            .map(|i| PhaseSpec::new(format!("Processing step {}", i), duration))
            .collect();
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            phases: vec![
                PhaseSpec::new("Launching analysis (simulated)", Duration::from_millis(200)),
                PhaseSpec::new(
                    "Quality control: collecting metrics (simulated)",
                    Duration::from_millis(200),
                ),
                PhaseSpec::new("Clustering/annotation (simulated)", Duration::from_millis(200)),
            ],
        }
    }
}

/// Execution pipeline - one instance is shared by all spawned task units;
/// per-task state lives in the registry.
pub struct ExecutionPipeline {
    registry: TaskRegistry,
    sink: Arc<dyn ReportSink>,
    notifier: Arc<dyn Notifier>,
    config: PipelineConfig,
}

impl ExecutionPipeline {
    pub fn new(
        registry: TaskRegistry,
        sink: Arc<dyn ReportSink>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            sink,
            notifier,
            config,
        }
    }

    /// Drive one task to a terminal state. Never returns an error: every
    /// failure is absorbed into the task's own status and log so one task
    /// can never take down its neighbors or the scheduler.
    pub async fn run(&self, task_id: TaskId, token: CancellationToken) {
        match self.execute(&task_id, &token).await {
            Ok(()) => {}
            Err(Error::Cancelled) => {
                self.registry
                    .add_log(&task_id, "Background execution was cancelled")
                    .await;
                // No-op when the cancel request already set the status
                if let Err(e) = self.registry.set_status(&task_id, TaskStatus::Canceled).await {
                    debug!("Task {} already terminal on cancellation: {}", task_id, e);
                }
                info!("Task {} was cancelled", task_id);
            }
            Err(e) => {
                warn!("Pipeline for task {} failed: {}", task_id, e);
                self.registry
                    .add_log(&task_id, format!("Execution error: {}", e))
                    .await;
                if let Err(e) = self.registry.set_status(&task_id, TaskStatus::Failed).await {
                    debug!("Task {} already terminal on failure: {}", task_id, e);
                }
                self.notify_owner(
                    &task_id,
                    format!(
                        "Task {} finished with an error. Check the task status for details.",
                        task_id.full()
                    ),
                )
                .await;
            }
        }
    }

    async fn execute(&self, task_id: &TaskId, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Claim the task. A task cancelled before its pipeline started (or
        // one that never existed) is left alone.
        match self.registry.set_status(task_id, TaskStatus::Running).await {
            Ok(()) => {}
            Err(Error::InvalidTransition { .. }) | Err(Error::NotFound(_)) => {
                debug!("Pipeline for task {} has nothing to do", task_id);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        // Simulated work phases, each a suspension point
        for phase in &self.config.phases {
            self.registry.add_log(task_id, phase.label.clone()).await;
            tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(phase.duration) => {}
            }
        }

        let snapshot = match self.registry.get(task_id).await {
            Some(snapshot) => snapshot,
            None => return Ok(()),
        };

        // Artifact rendering, also a suspension point. A renderer failure
        // is not a task failure: substitute the text fallback and continue.
        let artifact = tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            rendered = self.sink.render(&snapshot) => match rendered {
                Ok(artifact) => artifact,
                Err(e) => {
                    self.registry
                        .add_log(
                            task_id,
                            format!("Renderer '{}' failed: {}. Using text fallback.", self.sink.name(), e),
                        )
                        .await;
                    fallback_artifact(&snapshot)
                }
            },
        };

        // Atomic attach-and-complete. Losing here means a cancellation won
        // the terminal race; the artifact is discarded.
        match self
            .registry
            .attach_result(task_id, artifact.bytes, artifact.filename)
            .await
        {
            Ok(()) => {}
            Err(Error::InvalidTransition { .. }) => return Err(Error::Cancelled),
            Err(e) => return Err(e),
        }

        self.registry
            .add_log(task_id, "Analysis finished successfully")
            .await;

        self.notify_owner(
            task_id,
            format!(
                "Task {} completed. Use the report command to download the result.",
                task_id.full()
            ),
        )
        .await;

        Ok(())
    }

    /// Best-effort delivery: failures end up in the task log, never in the
    /// task status.
    async fn notify_owner(&self, task_id: &TaskId, text: String) {
        let Some(snapshot) = self.registry.get(task_id).await else {
            return;
        };

        if let Err(e) = self.notifier.notify(&snapshot.owner_id, &text).await {
            warn!("Failed to notify owner of task {}: {}", task_id, e);
            self.registry
                .add_log(task_id, format!("Owner notification failed: {}", e))
                .await;
        }
    }
}
