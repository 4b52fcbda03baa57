//! Core task execution: specs, futures, the registry, the submission gate and the pool.

pub mod error;
pub mod future;
pub mod registry;
pub mod semaphore;
pub mod task;
pub mod worker_pool;

pub use error::{AppResult, TaskError};
pub use future::{FutureState, TaskFuture, TaskOutcome};
pub use registry::{FutureRegistry, JobStatus, TaskCounts};
pub use semaphore::{Semaphore, SemaphorePermit};
pub use task::{TaskArgs, TaskFn, TaskId, TaskQueue, TaskSpec};
pub use worker_pool::{PoolStats, WorkerPool};
