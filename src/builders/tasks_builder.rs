//! Builder wiring configuration and collaborators into a [`ConcurrentTasks`].

use std::sync::Arc;

use crate::config::{PoolConfig, ScheduleConfig, TasksConfig};
use crate::core::{TaskError, TaskQueue};
use crate::infra::InMemoryQueue;
use crate::runtime::ConcurrentTasks;
use crate::util::{Clock, DiagnosticLog, NullLog, SystemClock, TracingLog};

/// Collects configuration and injected collaborators, then validates and builds.
pub struct ConcurrentTasksBuilder {
    config: TasksConfig,
    queue: Option<Box<dyn TaskQueue>>,
    log: Arc<dyn DiagnosticLog>,
    clock: Arc<dyn Clock>,
}

impl Default for ConcurrentTasksBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentTasksBuilder {
    /// Defaults: default config, in-memory queue, tracing log, system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: TasksConfig::default(),
            queue: None,
            log: Arc::new(TracingLog),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: TasksConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the pool section.
    #[must_use]
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.config.pool = pool;
        self
    }

    /// Replace the schedule section.
    #[must_use]
    pub fn schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.config.schedule = schedule;
        self
    }

    /// Shorthand for the worker cap and an optional core override.
    #[must_use]
    pub const fn workers(mut self, cap: usize, cores: Option<usize>) -> Self {
        self.config.pool.max_workers_cap = cap;
        self.config.pool.cores_override = cores;
        self
    }

    /// Use a custom queue backend.
    #[must_use]
    pub fn queue(mut self, queue: Box<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Diagnostic sink; `None` silences diagnostics.
    #[must_use]
    pub fn log(mut self, log: Option<Arc<dyn DiagnosticLog>>) -> Self {
        self.log = log.unwrap_or_else(|| Arc::new(NullLog));
        self
    }

    /// Time source for schedulers.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Configuration` describing the first invalid setting.
    pub fn build(self) -> Result<ConcurrentTasks, TaskError> {
        self.config.validate().map_err(TaskError::Configuration)?;
        let queue = self.queue.unwrap_or_else(|| Box::new(InMemoryQueue::new()));
        Ok(ConcurrentTasks::from_parts(
            self.config,
            queue,
            self.log,
            self.clock,
        ))
    }
}
