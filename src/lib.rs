//! # Taskgate
//!
//! Bounded thread-pool execution with deferred completion for fire-and-forget workloads.
//!
//! Callers queue tasks, drain the queue into a fixed pool of OS worker threads, and
//! observe progress through a registry of futures. Recurring background jobs run on
//! their own timer threads, and a completion watcher fires a one-shot callback once all
//! submitted work has settled.
//!
//! ## Pieces
//!
//! - **WorkerPool**: `min(2 * cores, cap)` dedicated OS threads fed over a channel
//! - **Semaphore**: permit gate throttling concurrent submissions to `max_workers - 1`
//! - **TaskQueue**: FIFO buffer of task specs awaiting submission
//! - **FutureRegistry**: append-only record of task futures; the basis for `status()`
//! - **RecurringScheduler**: one background thread invoking a job every interval
//! - **ScheduleManager**: named registry of schedulers for bulk or selective stop
//! - **CompletionWatcher**: a polling scheduler firing a callback exactly once
//!
//! ## Failure model
//!
//! Nothing raises across `submit`, `drain` or `schedule_*`. Task errors and panics are
//! captured on the task's future; submission and shutdown failures go to the injected
//! [`util::DiagnosticLog`].
//!
//! ```rust,ignore
//! use taskgate::core::TaskArgs;
//! use taskgate::runtime::ConcurrentTasks;
//!
//! let tasks = ConcurrentTasks::builder().workers(8, None).build()?;
//! let scope = tasks.enter()?;
//! for i in 0..10 {
//!     scope.submit(move |_| Ok((i * i).into()), TaskArgs::none());
//! }
//! scope.schedule_completion_callback(
//!     |_| {
//!         println!("all done");
//!         Ok(())
//!     },
//!     Some(0.1),
//!     TaskArgs::none(),
//! );
//! scope.drain(false);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Task specs, futures, the registry, the submission gate and the worker pool.
pub mod core;
/// Configuration models for pools and schedulers.
pub mod config;
/// Builders to construct task runtimes from configuration.
pub mod builders;
/// Queue backends.
pub mod infra;
/// Caller-facing runtime facade.
pub mod runtime;
/// Recurring schedulers, the schedule manager and completion watchers.
pub mod schedule;
/// Clock and logging collaborators.
pub mod util;
