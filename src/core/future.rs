//! Completion handles for submitted tasks.
//!
//! Each handle is a `Mutex` + `Condvar` slot shared between the worker that runs the
//! task and any number of readers. Waiting blocks on the condvar; nothing polls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TaskError;
use super::task::TaskId;

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureState {
    /// Handed to the pool, not yet picked up by a worker.
    Pending,
    /// A worker is executing it.
    Running,
    /// Finished successfully.
    Done,
    /// Returned an error or panicked.
    Failed,
}

impl FutureState {
    /// `Done` or `Failed`.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Result of a resolved task.
pub type TaskOutcome = Result<Value, TaskError>;

struct Slot {
    state: FutureState,
    outcome: Option<TaskOutcome>,
}

struct Shared {
    id: TaskId,
    name: String,
    slot: Mutex<Slot>,
    resolved: Condvar,
}

/// Handle to one task's execution. Cheap to clone; all clones observe the same task.
#[derive(Clone)]
pub struct TaskFuture {
    inner: Arc<Shared>,
}

impl TaskFuture {
    pub(crate) fn new(id: TaskId, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Shared {
                id,
                name: name.into(),
                slot: Mutex::new(Slot {
                    state: FutureState::Pending,
                    outcome: None,
                }),
                resolved: Condvar::new(),
            }),
        }
    }

    /// Task identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FutureState {
        self.inner.slot.lock().state
    }

    /// Finished, successfully or not.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state().is_resolved()
    }

    /// Currently executing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == FutureState::Running
    }

    /// Finished with an error.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state() == FutureState::Failed
    }

    /// Outcome if resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.inner.slot.lock().outcome.clone()
    }

    /// Block until resolved and return the outcome.
    pub fn wait(&self) -> TaskOutcome {
        let mut slot = self.inner.slot.lock();
        while !slot.state.is_resolved() {
            self.inner.resolved.wait(&mut slot);
        }
        slot.outcome
            .clone()
            .unwrap_or_else(|| Err(TaskError::Execution("outcome missing".into())))
    }

    /// Block until resolved or `timeout` elapses. Returns whether it resolved.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.inner.slot.lock();
        while !slot.state.is_resolved() {
            if self
                .inner
                .resolved
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return slot.state.is_resolved();
            }
        }
        true
    }

    /// Await resolution from async code without blocking the runtime.
    ///
    /// The condvar wait runs on tokio's blocking pool.
    #[cfg(feature = "tokio-runtime")]
    pub async fn wait_async(&self) -> TaskOutcome {
        let fut = self.clone();
        tokio::task::spawn_blocking(move || fut.wait())
            .await
            .unwrap_or_else(|e| Err(TaskError::Execution(format!("wait task failed: {e}"))))
    }

    pub(crate) fn mark_running(&self) {
        let mut slot = self.inner.slot.lock();
        if slot.state == FutureState::Pending {
            slot.state = FutureState::Running;
        }
    }

    pub(crate) fn resolve(&self, outcome: TaskOutcome) {
        let mut slot = self.inner.slot.lock();
        if slot.state.is_resolved() {
            return;
        }
        slot.state = if outcome.is_ok() {
            FutureState::Done
        } else {
            FutureState::Failed
        };
        slot.outcome = Some(outcome);
        self.inner.resolved.notify_all();
    }
}

impl std::fmt::Debug for TaskFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFuture")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}
