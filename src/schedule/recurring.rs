//! Background timer running one job on a fixed cadence.
//!
//! Each scheduler owns one OS thread. A pass runs the job if it is due, bumps the pass
//! counter, sleeps `interval` seconds, and stops itself once the counter passes `limit`.
//! The sleep is always `interval` *seconds*; `unit` only stretches the job's due period,
//! so a job declared in minutes still wakes its thread every `interval` seconds.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::pool::{DEFAULT_INTERVAL, DEFAULT_LIMIT};
use crate::config::TimeUnit;
use crate::core::{AppResult, TaskArgs, TaskError};
use crate::util::{secs_to_duration, Clock, DiagnosticLog, SystemClock, TracingLog};

/// Body of a recurring job.
pub type JobFn = Arc<dyn Fn(&TaskArgs) -> AppResult<()> + Send + Sync + 'static>;

/// Lifecycle of a [`RecurringScheduler`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Constructed; the thread has not started (or never will, if misconfigured).
    Created,
    /// The background thread is looping.
    Running,
    /// Stop requested or the iteration limit was passed.
    Stopped,
}

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

impl SchedulerState {
    const fn from_u8(v: u8) -> Self {
        match v {
            CREATED => Self::Created,
            RUNNING => Self::Running,
            _ => Self::Stopped,
        }
    }
}

struct Inner {
    id: Uuid,
    name: String,
    interval: f64,
    unit: TimeUnit,
    limit: u64,
    counter: AtomicU64,
    state: AtomicU8,
    inert: bool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOPPED
    }

    fn stop(&self) {
        if self.inert {
            return;
        }
        if self.state.swap(STOPPED, Ordering::AcqRel) != STOPPED {
            debug!(scheduler = %self.name, id = %self.id, "Recurring scheduler stopped");
        }
    }
}

/// Handle to a recurring job. Clones share the same job and thread.
#[derive(Clone)]
pub struct RecurringScheduler {
    inner: Arc<Inner>,
}

impl RecurringScheduler {
    /// Start configuring a scheduler.
    #[must_use]
    pub fn builder() -> RecurringBuilder {
        RecurringBuilder::default()
    }

    /// Unique id, used in logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Job name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Interval in `unit`s; also the sleep between passes, in seconds.
    #[must_use]
    pub fn interval(&self) -> f64 {
        self.inner.interval
    }

    /// Declared unit.
    #[must_use]
    pub fn unit(&self) -> TimeUnit {
        self.inner.unit
    }

    /// Iteration bound.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.inner.limit
    }

    /// Completed loop passes.
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.inner.counter.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether construction failed validation and no thread was started.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.inner.inert
    }

    /// Request the loop to end. Idempotent.
    ///
    /// A sleep in progress is not interrupted, so the thread exits within one interval.
    /// No-op on an inert scheduler.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Whether the background thread has exited (or never existed).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner
            .thread
            .lock()
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the background thread to exit.
    ///
    /// Returns immediately when called from the scheduler's own thread, when there is
    /// no thread, or when another caller already joined it.
    pub fn join(&self) {
        let handle = {
            let mut slot = self.inner.thread.lock();
            let own_thread = slot
                .as_ref()
                .is_some_and(|h| h.thread().id() == thread::current().id());
            if own_thread {
                return;
            }
            slot.take()
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn inert(name: String, interval: f64, unit: TimeUnit, limit: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                name,
                interval,
                unit,
                limit,
                counter: AtomicU64::new(0),
                state: AtomicU8::new(CREATED),
                inert: true,
                thread: Mutex::new(None),
            }),
        }
    }
}

impl std::fmt::Debug for RecurringScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecurringScheduler")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("interval", &self.inner.interval)
            .field("unit", &self.inner.unit)
            .field("limit", &self.inner.limit)
            .field("counter", &self.counter())
            .field("state", &self.state())
            .finish()
    }
}

/// Configures and starts a [`RecurringScheduler`].
pub struct RecurringBuilder {
    name: Option<String>,
    func: Option<JobFn>,
    interval: f64,
    unit: TimeUnit,
    limit: u64,
    args: TaskArgs,
    log: Arc<dyn DiagnosticLog>,
    clock: Arc<dyn Clock>,
}

impl Default for RecurringBuilder {
    fn default() -> Self {
        Self {
            name: None,
            func: None,
            interval: DEFAULT_INTERVAL,
            unit: TimeUnit::Seconds,
            limit: DEFAULT_LIMIT,
            args: TaskArgs::none(),
            log: Arc::new(TracingLog),
            clock: Arc::new(SystemClock),
        }
    }
}

impl RecurringBuilder {
    /// Job name; defaults to `"job"`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Job body.
    #[must_use]
    pub fn func<F>(mut self, func: F) -> Self
    where
        F: Fn(&TaskArgs) -> AppResult<()> + Send + Sync + 'static,
    {
        self.func = Some(Arc::new(func));
        self
    }

    /// Job body, already shared.
    #[must_use]
    pub fn job(mut self, func: JobFn) -> Self {
        self.func = Some(func);
        self
    }

    /// Interval between passes; must be positive.
    #[must_use]
    pub const fn interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    /// Unit of the due period.
    #[must_use]
    pub const fn unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Iteration bound.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Arguments handed to the job on every run.
    #[must_use]
    pub fn args(mut self, args: TaskArgs) -> Self {
        self.args = args;
        self
    }

    /// Diagnostic sink.
    #[must_use]
    pub fn log(mut self, log: Arc<dyn DiagnosticLog>) -> Self {
        self.log = log;
        self
    }

    /// Time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate and spawn the background thread.
    ///
    /// A missing body or a non-positive interval is logged as a configuration error and
    /// yields an inert scheduler that never leaves `Created`.
    #[must_use]
    pub fn start(self) -> RecurringScheduler {
        let name = self.name.unwrap_or_else(|| "job".into());

        let (func, sleep, period) = match validate(self.func, self.interval, self.unit) {
            Ok(parts) => parts,
            Err(e) => {
                self.log.error(&format!("scheduler `{name}`: {e}"));
                return RecurringScheduler::inert(name, self.interval, self.unit, self.limit);
            }
        };

        let inner = Arc::new(Inner {
            id: Uuid::new_v4(),
            name: name.clone(),
            interval: self.interval,
            unit: self.unit,
            limit: self.limit,
            counter: AtomicU64::new(0),
            state: AtomicU8::new(CREATED),
            inert: false,
            thread: Mutex::new(None),
        });

        let looper = Loop {
            inner: Arc::clone(&inner),
            func,
            args: self.args,
            sleep,
            period,
            log: Arc::clone(&self.log),
            clock: self.clock,
        };

        // Hold the slot while spawning so `join` cannot observe an empty slot.
        let mut slot = inner.thread.lock();
        match thread::Builder::new()
            .name(format!("taskgate-sched-{name}"))
            .spawn(move || looper.run())
        {
            Ok(handle) => *slot = Some(handle),
            Err(e) => {
                drop(slot);
                self.log.error(&format!(
                    "scheduler `{name}`: {}",
                    TaskError::Configuration(format!("failed to spawn thread: {e}"))
                ));
                return RecurringScheduler::inert(name, self.interval, self.unit, self.limit);
            }
        }
        drop(slot);

        debug!(
            scheduler = %name,
            id = %inner.id,
            interval = self.interval,
            unit = ?self.unit,
            limit = self.limit,
            "Recurring scheduler started"
        );
        RecurringScheduler { inner }
    }
}

fn validate(
    func: Option<JobFn>,
    interval: f64,
    unit: TimeUnit,
) -> Result<(JobFn, Duration, Duration), TaskError> {
    let func = func.ok_or_else(|| TaskError::Configuration("no job function supplied".into()))?;
    let sleep = secs_to_duration(interval).ok_or_else(|| {
        TaskError::Configuration(format!("interval must be positive, got {interval}"))
    })?;
    #[allow(clippy::cast_precision_loss)]
    let period = secs_to_duration(interval * unit.as_secs() as f64).unwrap_or(Duration::MAX);
    Ok((func, sleep, period))
}

struct Loop {
    inner: Arc<Inner>,
    func: JobFn,
    args: TaskArgs,
    sleep: Duration,
    period: Duration,
    log: Arc<dyn DiagnosticLog>,
    clock: Arc<dyn Clock>,
}

impl Loop {
    fn run(self) {
        let _ = self.inner.state.compare_exchange(
            CREATED,
            RUNNING,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        let mut next_run = self.clock.now().checked_add(self.period);
        while !self.inner.is_stopped() {
            let now = self.clock.now();
            if next_run.is_some_and(|due| now >= due) {
                self.run_job();
                next_run = self.clock.now().checked_add(self.period);
            }

            let passes = self.inner.counter.fetch_add(1, Ordering::AcqRel) + 1;
            self.clock.sleep(self.sleep);

            if passes > self.inner.limit {
                self.inner.stop();
            }
        }
        debug!(
            scheduler = %self.inner.name,
            id = %self.inner.id,
            passes = self.inner.counter.load(Ordering::Acquire),
            "Recurring scheduler thread exiting"
        );
    }

    fn run_job(&self) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.func)(&self.args)));
        let err = match result {
            Ok(Ok(())) => return,
            Ok(Err(e)) => TaskError::Execution(format!("{e:#}")),
            Err(payload) => TaskError::from_panic(payload.as_ref()),
        };
        self.log
            .error(&format!("scheduled job `{}`: {err}", self.inner.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::MemoryLog;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_missing_func_is_inert() {
        let log = Arc::new(MemoryLog::new());
        let sched = RecurringScheduler::builder()
            .name("nothing")
            .interval(0.01)
            .log(log.clone())
            .start();
        assert!(sched.is_inert());
        assert_eq!(sched.state(), SchedulerState::Created);
        sched.stop();
        assert_eq!(sched.state(), SchedulerState::Created);
        assert!(sched.is_finished());
        sched.join();
        assert_eq!(log.errors().len(), 1);
        assert!(log.errors()[0].contains("no job function"));
    }

    #[test]
    fn test_zero_interval_is_inert() {
        let log = Arc::new(MemoryLog::new());
        let sched = RecurringScheduler::builder()
            .func(|_| Ok(()))
            .interval(0.0)
            .log(log.clone())
            .start();
        assert!(sched.is_inert());
        assert!(log.errors()[0].contains("interval must be positive"));
    }

    #[test]
    fn test_runs_and_stops() {
        let runs = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&runs);
        let sched = RecurringScheduler::builder()
            .name("tick")
            .func(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .interval(0.01)
            .start();

        thread::sleep(Duration::from_millis(80));
        assert_eq!(sched.state(), SchedulerState::Running);
        sched.stop();
        sched.stop();
        sched.join();
        assert_eq!(sched.state(), SchedulerState::Stopped);
        assert!(sched.is_finished());
        assert!(runs.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_failing_job_keeps_looping() {
        let log = Arc::new(MemoryLog::new());
        let sched = RecurringScheduler::builder()
            .func(|_| anyhow::bail!("nope"))
            .interval(0.005)
            .limit(6)
            .log(log.clone())
            .start();
        sched.join();
        assert_eq!(sched.state(), SchedulerState::Stopped);
        assert!(log.errors().len() >= 2);
        assert!(log.errors().iter().all(|m| m.contains("nope")));
    }
}
