//! Worker pool with dedicated OS worker threads.
//!
//! Tasks handed to the pool travel over a channel to a fixed set of worker threads.
//! Each submission returns a [`TaskFuture`](crate::core::TaskFuture) that the worker
//! resolves when the task body returns, errors, or panics.
//!
//! # Example
//!
//! ```rust,ignore
//! use taskgate::config::PoolConfig;
//! use taskgate::core::{TaskArgs, TaskSpec, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::new().with_cores(2))?;
//! let spec = TaskSpec::new(0, "answer", Box::new(|_| Ok(42.into())), TaskArgs::none());
//! let fut = pool.submit(spec)?;
//! assert_eq!(fut.wait()?, 42);
//! pool.shutdown(true)?;
//! ```

mod native;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::{TaskFuture, TaskSpec};

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Currently executing tasks.
    pub active_tasks: u64,

    /// Tasks handed over but not yet picked up.
    pub queued_tasks: u64,

    /// Tasks that finished successfully.
    pub completed_tasks: u64,

    /// Tasks that errored or panicked.
    pub failed_tasks: u64,

    /// Tasks accepted by the pool.
    pub submitted_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub queued_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: self.queued_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
        }
    }
}

/// A spec travelling to a worker together with the future it must resolve.
#[derive(Debug)]
pub(crate) struct WorkerTask {
    pub spec: TaskSpec,
    pub future: TaskFuture,
}

pub use native::WorkerPool;
