//! Execution handle - cancellable reference to a running pipeline

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to the background unit executing one task.
///
/// Holds the cancellation token the pipeline selects on, plus the tokio
/// join handle so shutdown can await settlement. At most one handle exists
/// per task id (enforced by the registry).
#[derive(Debug)]
pub struct ExecutionHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl ExecutionHandle {
    pub fn new(token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self {
            token,
            join: Some(join),
        }
    }

    /// Signal cooperative cancellation. The pipeline observes the token at
    /// its suspension points; nothing is aborted preemptively. Safe to call
    /// any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the underlying pipeline has settled. A handle whose join
    /// handle was taken for drain also reports finished.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map(|j| j.is_finished()).unwrap_or(true)
    }

    /// Take the join handle for awaiting during drain. Subsequent calls
    /// return `None`.
    pub fn take_join(&mut self) -> Option<JoinHandle<()>> {
        self.join.take()
    }
}
