//! Caller-facing facade tying the queue, pool, registry and schedulers together.
//!
//! ```rust,ignore
//! use taskgate::runtime::ConcurrentTasks;
//! use taskgate::core::TaskArgs;
//!
//! let tasks = ConcurrentTasks::builder().build()?;
//! {
//!     let scope = tasks.enter()?;
//!     scope.submit(|args| Ok(args.positional[0].clone()), TaskArgs::none().arg(1));
//!     scope.drain(true);
//! } // pool shut down here, even on unwind
//! assert_eq!(tasks.status().done, 1);
//! ```
//!
//! # Usage contract
//!
//! `drain` assumes a single drainer per instance. Calling it concurrently from several
//! threads is not guarded and may interleave submissions out of FIFO order.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::config::{TasksConfig, TimeUnit};
use crate::core::{
    AppResult, FutureRegistry, JobStatus, PoolStats, Semaphore, TaskArgs, TaskCounts, TaskError,
    TaskFuture, TaskId, TaskQueue, TaskSpec, WorkerPool,
};
use crate::schedule::{CompletionSource, CompletionWatcher, RecurringScheduler, ScheduleManager};
use crate::util::{Clock, DiagnosticLog};

/// State shared with completion watchers.
struct Shared {
    queue: Mutex<Box<dyn TaskQueue>>,
    registry: FutureRegistry,
}

impl CompletionSource for Shared {
    fn status(&self) -> JobStatus {
        self.registry.status()
    }

    fn queued(&self) -> usize {
        self.queue.lock().len()
    }
}

/// A live pool together with the gate throttling submissions to it.
#[derive(Clone)]
struct Engine {
    pool: Arc<WorkerPool>,
    gate: Arc<Semaphore>,
}

/// Queue, pool, registry and schedulers owned by one use-site.
///
/// Independent instances share nothing and can be torn down separately.
pub struct ConcurrentTasks {
    config: TasksConfig,
    shared: Arc<Shared>,
    engine: Mutex<Option<Engine>>,
    schedules: ScheduleManager,
    next_task_id: AtomicU64,
    next_watcher_id: AtomicU64,
    log: Arc<dyn DiagnosticLog>,
    clock: Arc<dyn Clock>,
}

impl ConcurrentTasks {
    /// Start building an instance.
    #[must_use]
    pub fn builder() -> crate::builders::ConcurrentTasksBuilder {
        crate::builders::ConcurrentTasksBuilder::new()
    }

    /// Instance with the given configuration and default collaborators.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Configuration` if the configuration does not validate.
    pub fn new(config: TasksConfig) -> Result<Self, TaskError> {
        Self::builder().config(config).build()
    }

    pub(crate) fn from_parts(
        config: TasksConfig,
        queue: Box<dyn TaskQueue>,
        log: Arc<dyn DiagnosticLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let schedules = ScheduleManager::new(
            config.schedule.clone(),
            Arc::clone(&log),
            Arc::clone(&clock),
        );
        Self {
            config,
            shared: Arc::new(Shared {
                queue: Mutex::new(queue),
                registry: FutureRegistry::new(),
            }),
            engine: Mutex::new(None),
            schedules,
            next_task_id: AtomicU64::new(0),
            next_watcher_id: AtomicU64::new(0),
            log,
            clock,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TasksConfig {
        &self.config
    }

    /// Start the pool if none is live. Idempotent while a pool is running.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Configuration` if the pool cannot be constructed.
    pub fn configure(&self) -> Result<usize, TaskError> {
        self.engine().map(|e| e.pool.worker_count())
    }

    fn engine(&self) -> Result<Engine, TaskError> {
        let mut slot = self.engine.lock();
        if let Some(engine) = slot.as_ref() {
            if !engine.pool.is_closed() {
                return Ok(engine.clone());
            }
        }
        let pool = WorkerPool::new(self.config.pool.clone())?;
        let gate = Semaphore::new(self.config.pool.submission_permits());
        debug!(
            max_workers = pool.worker_count(),
            permits = gate.capacity(),
            "Task engine configured"
        );
        let engine = Engine {
            pool: Arc::new(pool),
            gate: Arc::new(gate),
        };
        *slot = Some(engine.clone());
        Ok(engine)
    }

    /// Configure the pool and return a guard that shuts it down when dropped.
    ///
    /// The guard releases the pool on every exit path, unwinding included.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Configuration` if the pool cannot be constructed.
    pub fn enter(&self) -> Result<TaskScope<'_>, TaskError> {
        self.configure()?;
        Ok(TaskScope { tasks: self })
    }

    /// Shut the pool down, waiting for its workers. Errors are logged, never returned.
    pub fn exit(&self) {
        self.shutdown(true);
    }

    /// Stop the live pool, if any. Errors are logged, never returned.
    pub fn shutdown(&self, wait: bool) {
        let Some(engine) = self.engine.lock().take() else {
            return;
        };
        if let Err(e) = engine.pool.shutdown(wait) {
            self.log.error(&e.to_string());
        }
    }

    /// Queue a task for the next drain. Never blocks.
    ///
    /// The task is named after the callable's type.
    pub fn submit<F>(&self, func: F, args: TaskArgs) -> TaskId
    where
        F: FnOnce(TaskArgs) -> AppResult<Value> + Send + 'static,
    {
        self.submit_named(std::any::type_name::<F>(), func, args)
    }

    /// Queue a task under an explicit name.
    pub fn submit_named<F>(&self, name: impl Into<String>, func: F, args: TaskArgs) -> TaskId
    where
        F: FnOnce(TaskArgs) -> AppResult<Value> + Send + 'static,
    {
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let spec = TaskSpec::new(id, name, Box::new(func), args);
        self.shared.queue.lock().enqueue(spec);
        id
    }

    /// Queue a closure that takes no arguments.
    pub fn submit_fn<F>(&self, func: F) -> TaskId
    where
        F: FnOnce() -> AppResult<Value> + Send + 'static,
    {
        let name = std::any::type_name::<F>();
        self.submit_named(name, move |_| func(), TaskArgs::none())
    }

    /// Submit every queued task to the pool, oldest first, then shut the pool down.
    ///
    /// Each submission holds one gate permit for as long as the hand-off takes. A task
    /// that cannot be submitted is logged and skipped. With `wait`, blocks until every
    /// recorded future resolves before a joining shutdown; otherwise the pool is released
    /// without joining and running tasks finish on their own.
    ///
    /// Returns `true` when every dequeued task reached the pool.
    pub fn drain(&self, wait: bool) -> bool {
        let mut engine: Option<Engine> = None;
        let mut all_submitted = true;

        loop {
            let Some(spec) = self.shared.queue.lock().dequeue() else {
                break;
            };

            if engine.is_none() {
                match self.engine() {
                    Ok(e) => engine = Some(e),
                    Err(e) => {
                        self.log.error(&format!("task {} `{}` dropped: {e}", spec.id, spec.name));
                        all_submitted = false;
                        continue;
                    }
                }
            }
            let Some(Engine { pool, gate }) = engine.as_ref() else {
                continue;
            };

            let permit = gate.acquire();
            let (id, name) = (spec.id, spec.name.clone());
            match pool.submit(spec) {
                Ok(future) => self.shared.registry.push(future),
                Err(e) => {
                    self.log.error(&format!("task {id} `{name}` dropped: {e}"));
                    all_submitted = false;
                }
            }
            drop(permit);
        }

        if wait {
            self.shared.registry.wait_all();
        }
        self.shutdown(wait);
        all_submitted
    }

    /// Non-blocking `{total, done, pending}` snapshot.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.shared.registry.status()
    }

    /// Non-blocking count of every state.
    #[must_use]
    pub fn snapshot(&self) -> TaskCounts {
        self.shared.registry.snapshot()
    }

    /// Running tasks after waiting for all recorded futures; see
    /// [`FutureRegistry::running_count`].
    pub fn running_count(&self) -> usize {
        self.shared.registry.running_count()
    }

    /// Failed tasks after waiting for all recorded futures.
    pub fn failed_count(&self) -> usize {
        self.shared.registry.failed_count()
    }

    /// Running tasks right now.
    #[must_use]
    pub fn running_now(&self) -> usize {
        self.shared.registry.running_now()
    }

    /// Failed tasks so far.
    #[must_use]
    pub fn failed_now(&self) -> usize {
        self.shared.registry.failed_now()
    }

    /// Recorded futures in submission order.
    #[must_use]
    pub fn futures(&self) -> Vec<TaskFuture> {
        self.shared.registry.futures()
    }

    /// Specs waiting for the next drain.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Statistics of the live pool, if one is running.
    #[must_use]
    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.engine.lock().as_ref().map(|e| e.pool.stats())
    }

    /// Gate of the live pool, if one is running.
    #[must_use]
    pub fn submission_gate(&self) -> Option<Arc<Semaphore>> {
        self.engine.lock().as_ref().map(|e| Arc::clone(&e.gate))
    }

    /// Recurring schedulers started through this instance.
    #[must_use]
    pub const fn schedules(&self) -> &ScheduleManager {
        &self.schedules
    }

    /// Run `func` every `interval` (in `unit`s) up to `limit` passes.
    ///
    /// `None` parameters take the configured defaults. The job is registered under its
    /// function's type name.
    pub fn schedule_recurring<F>(
        &self,
        func: F,
        interval: Option<f64>,
        unit: Option<TimeUnit>,
        limit: Option<u64>,
        args: TaskArgs,
    ) -> RecurringScheduler
    where
        F: Fn(&TaskArgs) -> AppResult<()> + Send + Sync + 'static,
    {
        self.schedules.add(func, interval, unit, limit, args)
    }

    /// Fire `callback` once, after every submitted task has settled and the queue is empty.
    ///
    /// Polls every `cb_interval` seconds (configured default when `None`). The watcher is
    /// registered with [`schedules`](Self::schedules) and stops itself after firing.
    pub fn schedule_completion_callback<F>(
        &self,
        callback: F,
        cb_interval: Option<f64>,
        args: TaskArgs,
    ) where
        F: FnOnce(TaskArgs) -> AppResult<()> + Send + 'static,
    {
        let n = self.next_watcher_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("completion-watcher-{n}");
        let watcher = CompletionWatcher::start(
            name.clone(),
            Arc::clone(&self.shared),
            Box::new(callback),
            args,
            cb_interval.unwrap_or(self.config.schedule.completion_interval),
            Arc::clone(&self.log),
            Arc::clone(&self.clock),
        );
        self.schedules.insert(name, watcher);
    }

    /// Stop the named scheduler, or all of them.
    pub fn stop_schedules(&self, key: Option<&str>) -> usize {
        self.schedules.stop(key)
    }
}

impl std::fmt::Debug for ConcurrentTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentTasks")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("queued", &self.queued())
            .field("pool", &self.pool_stats())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`ConcurrentTasks::enter`]; calls `exit` on drop.
#[must_use = "the pool is shut down as soon as the scope is dropped"]
pub struct TaskScope<'a> {
    tasks: &'a ConcurrentTasks,
}

impl Deref for TaskScope<'_> {
    type Target = ConcurrentTasks;

    fn deref(&self) -> &Self::Target {
        self.tasks
    }
}

impl Drop for TaskScope<'_> {
    fn drop(&mut self) {
        self.tasks.exit();
    }
}
