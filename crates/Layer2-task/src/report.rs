//! Report sink - renders the result artifact for a completed analysis
//!
//! The core treats the renderer as a capability with two outcomes: an
//! artifact, or a failure the pipeline recovers from with a fallback text
//! report. The artifact itself is an opaque byte blob plus a filename;
//! nothing in this layer cares about its format.

use crate::task::{TaskArtifact, TaskRecord};
use ampliflow_foundation::Result;
use async_trait::async_trait;

/// Report sink trait - implement to plug in a concrete renderer
/// (PDF generator, HTML templater, ...)
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Render the result artifact for a task snapshot
    async fn render(&self, task: &TaskRecord) -> Result<TaskArtifact>;

    /// Get sink name
    fn name(&self) -> &'static str;
}

/// Plain-text report sink - the default renderer.
///
/// Produces `report_<task id>.txt` summarizing the submitted sample and
/// parameters plus the simulated analysis sections.
#[derive(Debug, Default, Clone)]
pub struct TextReportSink;

impl TextReportSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportSink for TextReportSink {
    async fn render(&self, task: &TaskRecord) -> Result<TaskArtifact> {
        let body = [
            format!("Task ID: {}", task.id.full()),
            format!("Sample file: {}", task.filename),
            format!("Instrument: {}", task.param("instrument").unwrap_or("-")),
            format!("Reference: {}", task.param("reference").unwrap_or("-")),
            format!("Clustering: {}", task.param("clustering").unwrap_or("-")),
            String::new(),
            "--- Simulated QC metrics ---".to_string(),
            "Alpha diversity: (simulated values)".to_string(),
            "Beta diversity: (simulated values)".to_string(),
            "Taxonomy table: (simulated)".to_string(),
        ]
        .join("\n");

        Ok(TaskArtifact::new(
            body.into_bytes(),
            format!("report_{}.txt", task.id.full()),
        ))
    }

    fn name(&self) -> &'static str {
        "text"
    }
}

/// Minimal fallback artifact used when the configured sink fails.
///
/// A renderer failure is not a task failure: the pipeline substitutes this
/// UTF-8 summary and still completes the task.
pub fn fallback_artifact(task: &TaskRecord) -> TaskArtifact {
    let body = [
        format!("Task ID: {}", task.id.full()),
        format!("Sample file: {}", task.filename),
        format!("Instrument: {}", task.param("instrument").unwrap_or("-")),
        format!("Reference: {}", task.param("reference").unwrap_or("-")),
        format!("Clustering: {}", task.param("clustering").unwrap_or("-")),
        String::new(),
        "Fallback report (renderer unavailable).".to_string(),
    ]
    .join("\n");

    TaskArtifact::new(body.into_bytes(), format!("report_{}.txt", task.id.full()))
}
