//! Error types for task submission, execution, scheduling and shutdown.

use thiserror::Error;

/// Failures produced by the task core.
///
/// None of these cross `submit`, `drain` or `schedule_*`; they are logged or recorded on
/// the task's future instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// A task could not be handed to the pool (closed, saturated, misconfigured).
    #[error("submission failed: {0}")]
    Submission(String),
    /// The task body returned an error or panicked.
    #[error("execution failed: {0}")]
    Execution(String),
    /// Invalid scheduler or pool parameters.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Stopping the pool did not go cleanly.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

impl TaskError {
    /// Build an execution error from a panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".into());
        Self::Execution(format!("task panicked: {msg}"))
    }
}

/// Application-facing result using anyhow for task and job bodies.
pub type AppResult<T> = Result<T, anyhow::Error>;
