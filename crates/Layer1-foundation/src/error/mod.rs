//! Error types for AmpliFlow
//!
//! All errors are defined centrally so every layer reports failures with the
//! same taxonomy.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// AmpliFlow error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Registry
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Duplicate submission: {0}")]
    DuplicateSubmission(String),

    // ========================================================================
    // Pipeline
    // ========================================================================
    #[error("Task error: {0}")]
    Task(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // General
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check whether the error should be shown to an end user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InvalidTransition { .. }
                | Error::DuplicateSubmission(_)
                | Error::InvalidInput(_)
                | Error::Cancelled
        )
    }

    /// Check whether the error is recovered inside a pipeline rather than
    /// terminating the task
    pub fn is_recoverable_in_pipeline(&self) -> bool {
        matches!(self, Error::Render(_) | Error::Notify(_))
    }

    /// InvalidTransition helper
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}

// ============================================================================
// From impls (extra conversions)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
