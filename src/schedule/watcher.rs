//! One-shot completion callback driven by a polling recurring scheduler.
//!
//! The watcher does not react to the last task finishing. It notices on its next poll,
//! so the callback fires up to one `interval` after the work settles.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{AppResult, FutureRegistry, JobStatus, TaskArgs, TaskError};
use crate::util::{Clock, DiagnosticLog};

use super::recurring::RecurringScheduler;

/// Final callback fired once everything has settled.
pub type CompletionCallback = Box<dyn FnOnce(TaskArgs) -> AppResult<()> + Send + 'static>;

/// What a watcher polls: registry status plus the number of specs not yet drained.
pub trait CompletionSource: Send + Sync + 'static {
    /// Current registry status.
    fn status(&self) -> JobStatus;
    /// Specs still waiting in the task queue.
    fn queued(&self) -> usize;
}

impl CompletionSource for FutureRegistry {
    fn status(&self) -> JobStatus {
        Self::status(self)
    }

    fn queued(&self) -> usize {
        0
    }
}

/// Builds the recurring scheduler behind a completion callback.
pub struct CompletionWatcher;

impl CompletionWatcher {
    /// Start polling `source` every `interval` seconds.
    ///
    /// Once nothing is pending and nothing is queued, the callback runs with `args` and
    /// the scheduler stops itself. The returned scheduler is the watcher's own handle;
    /// stopping it early prevents the callback from ever firing.
    pub fn start<S>(
        name: impl Into<String>,
        source: Arc<S>,
        callback: CompletionCallback,
        args: TaskArgs,
        interval: f64,
        log: Arc<dyn DiagnosticLog>,
        clock: Arc<dyn Clock>,
    ) -> RecurringScheduler
    where
        S: CompletionSource + ?Sized,
    {
        let name = name.into();
        let check = Arc::new(CompletionCheck::new(
            name.clone(),
            source,
            callback,
            args,
            Arc::clone(&log),
        ));

        let body = Arc::clone(&check);
        let scheduler = RecurringScheduler::builder()
            .name(name)
            .interval(interval)
            .log(log)
            .clock(clock)
            .func(move |_| {
                body.poll();
                Ok(())
            })
            .start();

        if !scheduler.is_inert() {
            check.arm(scheduler.clone());
        }
        scheduler
    }
}

/// One poll of a completion watcher: progress logging, the one-shot callback and the
/// self-stop.
struct CompletionCheck<S: ?Sized> {
    name: String,
    source: Arc<S>,
    /// The watcher's own handle until the callback fires; emptied exactly once.
    self_ref: Mutex<Option<RecurringScheduler>>,
    callback: Mutex<Option<(CompletionCallback, TaskArgs)>>,
    log: Arc<dyn DiagnosticLog>,
}

impl<S> CompletionCheck<S>
where
    S: CompletionSource + ?Sized,
{
    fn new(
        name: String,
        source: Arc<S>,
        callback: CompletionCallback,
        args: TaskArgs,
        log: Arc<dyn DiagnosticLog>,
    ) -> Self {
        Self {
            name,
            source,
            self_ref: Mutex::new(None),
            callback: Mutex::new(Some((callback, args))),
            log,
        }
    }

    fn arm(&self, scheduler: RecurringScheduler) {
        *self.self_ref.lock() = Some(scheduler);
    }

    /// Returns whether this poll fired the callback.
    fn poll(&self) -> bool {
        let status = self.source.status();
        let queued = self.source.queued();
        if status.pending > 0 || queued > 0 {
            self.log.debug(&format!(
                "`{}` waiting: {}/{} done, {} pending, {queued} queued",
                self.name, status.done, status.total, status.pending
            ));
            return false;
        }

        let Some(me) = self.self_ref.lock().take() else {
            return false;
        };
        let fired = self.callback.lock().take().is_some_and(|(cb, cb_args)| {
            self.log.debug(&format!(
                "`{}` all {} tasks settled, firing callback",
                self.name, status.total
            ));
            let err = match panic::catch_unwind(AssertUnwindSafe(|| cb(cb_args))) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(TaskError::Execution(format!("{e:#}"))),
                Err(payload) => Some(TaskError::from_panic(payload.as_ref())),
            };
            if let Some(err) = err {
                self.log
                    .error(&format!("`{}` completion callback: {err}", self.name));
            }
            true
        });
        me.stop();
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskFuture;
    use crate::schedule::SchedulerState;
    use crate::util::{MemoryLog, SystemClock};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fires_once_after_registry_settles() {
        let registry = FutureRegistry::new();
        let fut = TaskFuture::new(0, "slow");
        registry.push(fut.clone());

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let log = Arc::new(MemoryLog::new());
        let watcher = CompletionWatcher::start(
            "watch",
            Arc::new(registry),
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            TaskArgs::none(),
            0.01,
            log.clone(),
            Arc::new(SystemClock),
        );

        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        fut.resolve(Ok(Value::Null));

        watcher.join();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(watcher.state(), SchedulerState::Stopped);
        assert!(log.debugs().iter().any(|m| m.contains("waiting")));
    }

    #[test]
    fn test_callback_error_is_logged() {
        let log = Arc::new(MemoryLog::new());
        let watcher = CompletionWatcher::start(
            "watch",
            Arc::new(FutureRegistry::new()),
            Box::new(|_| anyhow::bail!("callback broke")),
            TaskArgs::none(),
            0.005,
            log.clone(),
            Arc::new(SystemClock),
        );
        watcher.join();
        assert!(log.errors().iter().any(|m| m.contains("callback broke")));
    }

    #[test]
    fn test_repeated_polls_after_settling_fire_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let check = CompletionCheck::new(
            "watch".to_string(),
            Arc::new(FutureRegistry::new()),
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            TaskArgs::none(),
            Arc::new(MemoryLog::new()),
        );
        let idle = RecurringScheduler::builder()
            .name("watch")
            .func(|_| Ok(()))
            .interval(60.0)
            .start();
        check.arm(idle.clone());

        assert!(check.poll());
        assert!(!check.poll());
        assert!(!check.poll());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(idle.state(), SchedulerState::Stopped);
    }
}
