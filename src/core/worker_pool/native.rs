//! Native implementation of `WorkerPool` using OS threads.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel recv; futures resolve through a Condvar
//! - **Failure containment**: task errors and panics land on the task's future
//! - **Clean shutdown**: dropping the sender lets workers finish what they were handed
//!   and exit naturally

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::core::{TaskError, TaskFuture, TaskSpec};

use super::{PoolCounters, PoolStats, WorkerTask};

/// Fixed-size pool of OS threads executing [`TaskSpec`]s.
///
/// Sized to `min(2 * cores, cap)` workers from its [`PoolConfig`].
pub struct WorkerPool {
    /// Pool configuration.
    config: PoolConfig,

    /// Resolved worker count.
    worker_count: usize,

    /// Task sender (to workers). Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<WorkerTask>>>,

    /// Pool statistics counters (lock-free atomics).
    counters: Arc<PoolCounters>,

    /// Shutdown flag (lock-free atomic).
    shutdown: AtomicBool,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool and spawn its worker threads.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Configuration` if the configuration is invalid or a worker
    /// thread cannot be spawned.
    pub fn new(config: PoolConfig) -> Result<Self, TaskError> {
        config.validate().map_err(TaskError::Configuration)?;

        let worker_count = config.max_workers();
        let (task_tx, task_rx) = match config.max_queue_depth {
            Some(depth) => bounded::<WorkerTask>(depth),
            None => unbounded::<WorkerTask>(),
        };
        let counters = Arc::new(PoolCounters::default());

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            match spawn_worker(worker_id, task_rx.clone(), Arc::clone(&counters), &config) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Closing the channel lets the already-spawned workers exit.
                    drop(task_tx);
                    return Err(TaskError::Configuration(format!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(
            worker_count = worker_count,
            cores = config.cores(),
            cap = config.max_workers_cap,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(Self {
            config,
            worker_count,
            task_tx: Mutex::new(Some(task_tx)),
            counters,
            shutdown: AtomicBool::new(false),
            workers: Mutex::new(workers),
        })
    }

    /// Hand a task to the workers without blocking.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Submission` if the pool is shut down or its channel is full.
    pub fn submit(&self, spec: TaskSpec) -> Result<TaskFuture, TaskError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(TaskError::Submission("pool has been shut down".into()));
        }

        let task_id = spec.id;
        let future = TaskFuture::new(task_id, spec.name.clone());
        let task = WorkerTask {
            spec,
            future: future.clone(),
        };

        let task_tx_guard = self.task_tx.lock();
        let Some(task_tx) = task_tx_guard.as_ref() else {
            return Err(TaskError::Submission("pool has been shut down".into()));
        };

        // Count before sending so a fast worker never decrements below zero.
        self.counters.queued_tasks.fetch_add(1, Ordering::Relaxed);
        match task_tx.try_send(task) {
            Ok(()) => {
                self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = task_id, "Task submitted to worker pool");
                Ok(future)
            }
            Err(TrySendError::Full(_)) => {
                self.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                warn!(task_id = task_id, "Worker pool queue is full");
                Err(TaskError::Submission("pool saturated".into()))
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                Err(TaskError::Submission("pool workers have exited".into()))
            }
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Whether `shutdown` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.worker_count)
    }

    /// Stop accepting tasks and release the workers.
    ///
    /// Workers still finish every task already handed to them. With `wait`, each worker
    /// is joined for up to the configured join timeout and detached if it overruns;
    /// without it, workers are detached immediately. Repeated calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Shutdown` naming workers that panicked or overran the timeout.
    /// The pool is closed either way.
    pub fn shutdown(&self, wait: bool) -> Result<(), TaskError> {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        info!(wait = wait, "Shutting down worker pool");

        // Drop the sender to unblock all workers waiting on recv()
        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        let worker_count = workers.len();
        if !wait {
            debug!(worker_count = worker_count, "Worker pool detached without joining");
            return Ok(());
        }

        let timeout = self.config.shutdown_join_timeout();
        let mut problems = Vec::new();
        for (idx, worker) in workers.into_iter().enumerate() {
            // Join on a helper thread so a stuck worker cannot hang the caller.
            let (tx, rx) = crossbeam_channel::bounded(1);
            let joiner = thread::spawn(move || {
                let _ = tx.send(worker.join().is_ok());
            });

            match rx.recv_timeout(timeout) {
                Ok(true) => {
                    debug!(worker_id = idx, "Worker joined successfully");
                    let _ = joiner.join();
                }
                Ok(false) => {
                    warn!(worker_id = idx, "Worker panicked");
                    problems.push(format!("worker {idx} panicked"));
                    let _ = joiner.join();
                }
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                    problems.push(format!("worker {idx} did not exit within {timeout:?}"));
                }
            }
        }

        info!(worker_count = worker_count, "Worker pool shut down complete");
        if problems.is_empty() {
            Ok(())
        } else {
            Err(TaskError::Shutdown(problems.join("; ")))
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal shutdown but don't join workers in Drop.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    worker_id: usize,
    task_rx: Receiver<WorkerTask>,
    counters: Arc<PoolCounters>,
    config: &PoolConfig,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");

            // recv() keeps yielding buffered tasks after the sender is dropped and
            // returns Err once the channel is empty.
            while let Ok(WorkerTask { spec, future }) = task_rx.recv() {
                counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                counters.active_tasks.fetch_add(1, Ordering::Relaxed);

                let task_id = spec.id;
                debug!(
                    worker_id = worker_id,
                    task_id = task_id,
                    task = %spec.name,
                    "Worker executing task"
                );
                future.mark_running();

                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| spec.run())) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TaskError::Execution(format!("{e:#}"))),
                    Err(payload) => Err(TaskError::from_panic(payload.as_ref())),
                };

                if let Err(e) = &outcome {
                    debug!(worker_id = worker_id, task_id = task_id, error = %e, "Task failed");
                    counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                }
                counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
                future.resolve(outcome);
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}
