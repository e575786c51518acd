//! # ampliflow-task
//!
//! Task lifecycle management and background execution for AmpliFlow.
//! Tracks user-submitted analysis tasks through creation, background
//! execution, completion/failure/cancellation, result storage, and owner
//! notification.
//!
//! ## Features
//!
//! - Single-source-of-truth task registry with atomic state transitions
//! - One background pipeline per submitted task, cooperative cancellation
//! - Race-free terminal states (at most one terminal transition wins)
//! - Pluggable report rendering with a text fallback
//! - Best-effort owner notification that never fails a task
//! - Bounded-grace drain for process shutdown
//!
//! ## Usage
//!
//! ```ignore
//! let registry = TaskRegistry::new();
//! let scheduler = JobScheduler::new(
//!     registry.clone(),
//!     Arc::new(TextReportSink::new()),
//!     Arc::new(TracingNotifier::new()),
//!     PipelineConfig::default(),
//! );
//!
//! let id = registry.create(owner, "sample.fastq", params).await;
//! scheduler.submit(&id).await?;
//! // ... later ...
//! scheduler.cancel(&id).await?;
//! scheduler.drain(Duration::from_secs(5)).await;
//! ```

pub mod handle;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod state;
pub mod task;

// Task system
pub use handle::ExecutionHandle;
pub use pipeline::{ExecutionPipeline, PhaseSpec, PipelineConfig};
pub use registry::TaskRegistry;
pub use scheduler::JobScheduler;
pub use state::TaskStatus;
pub use task::{LogEntry, TaskArtifact, TaskId, TaskParams, TaskRecord};

// Collaborator interfaces
pub use notify::{ChannelNotifier, Notification, Notifier, TracingNotifier};
pub use report::{fallback_artifact, ReportSink, TextReportSink};
