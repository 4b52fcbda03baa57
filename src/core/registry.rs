//! Append-only record of submitted tasks and the status views built on it.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::future::{FutureState, TaskFuture};

/// `{total, done, pending}` view of the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Futures recorded so far.
    pub total: usize,
    /// Futures that resolved (done or failed).
    pub done: usize,
    /// `total - done`.
    pub pending: usize,
}

impl JobStatus {
    /// True when nothing recorded is still outstanding.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.pending == 0
    }
}

/// Breakdown of every state at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    /// Futures recorded so far.
    pub total: usize,
    /// Resolved futures, failed ones included.
    pub done: usize,
    /// Not yet resolved.
    pub pending: usize,
    /// Executing right now.
    pub running: usize,
    /// Resolved with an error.
    pub failed: usize,
}

/// Ordered, append-only sequence of task futures; insertion order is submission order.
///
/// Appends take the write lock, every view takes the read lock, so readers on other
/// threads see a consistent prefix.
#[derive(Debug, Default, Clone)]
pub struct FutureRegistry {
    futures: Arc<RwLock<Vec<TaskFuture>>>,
}

impl FutureRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a future.
    pub fn push(&self, future: TaskFuture) {
        self.futures.write().push(future);
    }

    /// Number of recorded futures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.futures.read().len()
    }

    /// Nothing recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of every recorded handle, in submission order.
    #[must_use]
    pub fn futures(&self) -> Vec<TaskFuture> {
        self.futures.read().clone()
    }

    /// Non-blocking `{total, done, pending}` snapshot.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        let futures = self.futures.read();
        let total = futures.len();
        let done = futures.iter().filter(|f| f.is_done()).count();
        JobStatus {
            total,
            done,
            pending: total - done,
        }
    }

    /// Non-blocking breakdown of every state.
    #[must_use]
    pub fn snapshot(&self) -> TaskCounts {
        let futures = self.futures.read();
        let mut counts = TaskCounts {
            total: futures.len(),
            ..TaskCounts::default()
        };
        for f in futures.iter() {
            match f.state() {
                FutureState::Pending => counts.pending += 1,
                FutureState::Running => {
                    counts.pending += 1;
                    counts.running += 1;
                }
                FutureState::Done => counts.done += 1,
                FutureState::Failed => {
                    counts.done += 1;
                    counts.failed += 1;
                }
            }
        }
        counts
    }

    /// Block until every future recorded at call time has resolved.
    ///
    /// Futures are cloned out first so the lock is not held while waiting.
    pub fn wait_all(&self) {
        for f in self.futures() {
            let _ = f.wait();
        }
    }

    /// Running tasks, counted after waiting for every recorded future to resolve.
    ///
    /// Because it waits first, the answer is always 0 for the futures it saw. Use
    /// [`running_now`](Self::running_now) for a live count.
    pub fn running_count(&self) -> usize {
        self.wait_all();
        self.running_now()
    }

    /// Failed tasks, counted after waiting for every recorded future to resolve.
    pub fn failed_count(&self) -> usize {
        self.wait_all();
        self.failed_now()
    }

    /// Tasks executing at this instant.
    #[must_use]
    pub fn running_now(&self) -> usize {
        self.futures.read().iter().filter(|f| f.is_running()).count()
    }

    /// Tasks resolved with an error so far.
    #[must_use]
    pub fn failed_now(&self) -> usize {
        self.futures.read().iter().filter(|f| f.is_failed()).count()
    }
}
