//! # ampliflow-foundation
//!
//! Foundation layer for AmpliFlow:
//! - Error: central error taxonomy shared by every layer
//!
//! Higher layers (`ampliflow-task` and the conversational front-ends) build
//! on these types so that task-lifecycle failures surface with one shape
//! everywhere.

pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};
