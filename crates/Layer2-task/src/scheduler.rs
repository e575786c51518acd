//! Job scheduler - launches execution pipelines for submitted tasks
//!
//! One spawned tokio task per submission; the resulting handle is recorded
//! in the registry under the task id, which is also the arbiter against
//! duplicate submissions.

use crate::handle::ExecutionHandle;
use crate::notify::Notifier;
use crate::pipeline::{ExecutionPipeline, PipelineConfig};
use crate::registry::TaskRegistry;
use crate::report::ReportSink;
use crate::state::TaskStatus;
use crate::task::TaskId;
use ampliflow_foundation::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Job scheduler - owns the pipeline collaborators and the registry handle
#[derive(Clone)]
pub struct JobScheduler {
    registry: TaskRegistry,
    pipeline: Arc<ExecutionPipeline>,
}

impl JobScheduler {
    pub fn new(
        registry: TaskRegistry,
        sink: Arc<dyn ReportSink>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Self {
        let pipeline = Arc::new(ExecutionPipeline::new(
            registry.clone(),
            sink,
            notifier,
            config,
        ));
        Self { registry, pipeline }
    }

    /// Access the shared registry
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Start the execution pipeline for a created task.
    ///
    /// The spawned unit waits for its handle registration to win before
    /// touching the registry, so a losing duplicate submission exits
    /// without doing any work and without disturbing the first pipeline.
    pub async fn submit(&self, task_id: &TaskId) -> Result<()> {
        if self.registry.get(task_id).await.is_none() {
            return Err(Error::NotFound(format!("Task {} not found", task_id)));
        }

        let token = CancellationToken::new();
        let (go_tx, go_rx) = oneshot::channel::<()>();

        let pipeline = Arc::clone(&self.pipeline);
        let id = *task_id;
        let run_token = token.clone();
        let join = tokio::spawn(async move {
            if go_rx.await.is_err() {
                debug!("Discarding unregistered pipeline for task {}", id);
                return;
            }
            pipeline.run(id, run_token).await;
        });

        match self
            .registry
            .register_handle(id, ExecutionHandle::new(token, join))
            .await
        {
            Ok(()) => {
                let _ = go_tx.send(());
                info!("Submitted task {}", task_id);
                Ok(())
            }
            Err(e) => {
                drop(go_tx);
                Err(e)
            }
        }
    }

    /// Request cancellation; returns the task's current status
    pub async fn cancel(&self, task_id: &TaskId) -> Result<TaskStatus> {
        self.registry.cancel(task_id).await
    }

    /// Cancel all live pipelines and await settlement up to `grace`.
    /// Returns the number of pipelines abandoned after the grace period.
    pub async fn drain(&self, grace: Duration) -> usize {
        self.registry.drain(grace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TracingNotifier;
    use crate::report::TextReportSink;
    use crate::task::TaskParams;

    fn scheduler(registry: TaskRegistry) -> JobScheduler {
        JobScheduler::new(
            registry,
            Arc::new(TextReportSink::new()),
            Arc::new(TracingNotifier::new()),
            PipelineConfig::default().with_uniform_phases(2, Duration::from_millis(10)),
        )
    }

    async fn settle(registry: &TaskRegistry, id: &TaskId) -> TaskStatus {
        for _ in 0..200 {
            let record = registry.get(id).await.unwrap();
            if record.status.is_terminal() {
                return record.status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not settle", id);
    }

    #[tokio::test]
    async fn test_submit_runs_to_completion() {
        let registry = TaskRegistry::new();
        let scheduler = scheduler(registry.clone());
        let id = registry.create("u1", "f.fastq", TaskParams::new()).await;

        scheduler.submit(&id).await.unwrap();
        assert_eq!(settle(&registry, &id).await, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_submit_unknown_task() {
        let registry = TaskRegistry::new();
        let scheduler = scheduler(registry);

        let err = scheduler.submit(&TaskId::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_submit_rejected() {
        let registry = TaskRegistry::new();
        let scheduler = scheduler(registry.clone());
        let id = registry.create("u1", "f.fastq", TaskParams::new()).await;

        scheduler.submit(&id).await.unwrap();
        let err = scheduler.submit(&id).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateSubmission(_)));

        // The first pipeline still completes normally
        assert_eq!(settle(&registry, &id).await, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let registry = TaskRegistry::new();
        let scheduler = JobScheduler::new(
            registry.clone(),
            Arc::new(TextReportSink::new()),
            Arc::new(TracingNotifier::new()),
            PipelineConfig::default().with_uniform_phases(3, Duration::from_secs(30)),
        );
        let id = registry.create("u1", "f.fastq", TaskParams::new()).await;

        scheduler.submit(&id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = scheduler.cancel(&id).await.unwrap();
        assert_eq!(status, TaskStatus::Canceled);
        assert_eq!(settle(&registry, &id).await, TaskStatus::Canceled);
        assert!(registry.get(&id).await.unwrap().result.is_none());
    }

    #[tokio::test]
    async fn test_drain_settles_live_pipelines() {
        let registry = TaskRegistry::new();
        let scheduler = JobScheduler::new(
            registry.clone(),
            Arc::new(TextReportSink::new()),
            Arc::new(TracingNotifier::new()),
            PipelineConfig::default().with_uniform_phases(1, Duration::from_secs(60)),
        );

        let mut ids = Vec::new();
        for i in 0..3 {
            let id = registry
                .create(format!("u{}", i), "f.fastq", TaskParams::new())
                .await;
            scheduler.submit(&id).await.unwrap();
            ids.push(id);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Grace far shorter than the remaining work; cancelled pipelines
        // settle promptly anyway because they select on the token
        let abandoned = scheduler.drain(Duration::from_secs(2)).await;
        assert_eq!(abandoned, 0);

        for id in &ids {
            let record = registry.get(id).await.unwrap();
            assert_eq!(record.status, TaskStatus::Canceled);
        }
        assert_eq!(registry.live_handle_count().await, 0);
    }
}
