//! Named registry of recurring schedulers.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::{ScheduleConfig, TimeUnit};
use crate::core::{AppResult, TaskArgs};
use crate::util::{Clock, DiagnosticLog, SystemClock, TracingLog};

use super::recurring::{JobFn, RecurringScheduler};

/// Keeps every recurring scheduler reachable by name so they can be stopped in bulk.
///
/// Entries are never removed; stopped schedulers stay queryable. Dropping the manager
/// stops every scheduler it holds.
pub struct ScheduleManager {
    events: RwLock<BTreeMap<String, RecurringScheduler>>,
    defaults: ScheduleConfig,
    log: Arc<dyn DiagnosticLog>,
    clock: Arc<dyn Clock>,
}

impl Default for ScheduleManager {
    fn default() -> Self {
        Self::new(ScheduleConfig::default(), Arc::new(TracingLog), Arc::new(SystemClock))
    }
}

impl ScheduleManager {
    /// Manager whose schedulers use the given defaults and collaborators.
    #[must_use]
    pub fn new(
        defaults: ScheduleConfig,
        log: Arc<dyn DiagnosticLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events: RwLock::new(BTreeMap::new()),
            defaults,
            log,
            clock,
        }
    }

    /// Defaults applied when callers leave parameters unset.
    #[must_use]
    pub const fn defaults(&self) -> &ScheduleConfig {
        &self.defaults
    }

    /// Start a job keyed by its function's type name.
    ///
    /// `None` parameters fall back to the manager's defaults.
    pub fn add<F>(
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
        let key = std::any::type_name::<F>();
        self.add_named(key, Arc::new(func), interval, unit, limit, args)
    }

    /// Start a job under an explicit key.
    ///
    /// When `key` is already taken, the new job is registered as `key#2`, `key#3` and so on;
    /// the scheduler already running under `key` is left alone. The handle's
    /// [`name`](RecurringScheduler::name) is the key actually used.
    pub fn add_named(
        &self,
        key: impl Into<String>,
        func: JobFn,
        interval: Option<f64>,
        unit: Option<TimeUnit>,
        limit: Option<u64>,
        args: TaskArgs,
    ) -> RecurringScheduler {
        let mut events = self.events.write();
        let key = free_key(&events, key.into());
        let scheduler = RecurringScheduler::builder()
            .name(key.clone())
            .job(func)
            .interval(interval.unwrap_or(self.defaults.default_interval))
            .unit(unit.unwrap_or(self.defaults.default_unit))
            .limit(limit.unwrap_or(self.defaults.default_limit))
            .args(args)
            .log(Arc::clone(&self.log))
            .clock(Arc::clone(&self.clock))
            .start();
        events.insert(key, scheduler.clone());
        scheduler
    }

    /// Register an already-built scheduler and return the key it was stored under.
    ///
    /// Collisions are resolved the same way as in [`add_named`](Self::add_named).
    pub fn insert(&self, key: impl Into<String>, scheduler: RecurringScheduler) -> String {
        let mut events = self.events.write();
        let key = free_key(&events, key.into());
        events.insert(key.clone(), scheduler);
        key
    }

    /// Stop the scheduler under `key`, or every scheduler when `key` is `None`.
    ///
    /// Returns how many schedulers were signalled.
    pub fn stop(&self, key: Option<&str>) -> usize {
        let events = self.events.read();
        match key {
            Some(key) => events.get(key).map_or_else(
                || {
                    self.log.debug(&format!("no scheduler registered as `{key}`"));
                    0
                },
                |s| {
                    s.stop();
                    1
                },
            ),
            None => {
                for s in events.values() {
                    s.stop();
                }
                events.len()
            }
        }
    }

    /// Scheduler registered under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<RecurringScheduler> {
        self.events.read().get(key).cloned()
    }

    /// Registered keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.events.read().keys().cloned().collect()
    }

    /// Number of registered schedulers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Nothing registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Wait for every registered scheduler's thread to exit.
    ///
    /// Only returns once each one has stopped, either explicitly or by reaching its limit.
    pub fn join_all(&self) {
        let schedulers: Vec<_> = self.events.read().values().cloned().collect();
        for s in schedulers {
            s.join();
        }
    }
}

impl Drop for ScheduleManager {
    fn drop(&mut self) {
        let stopped = self.stop(None);
        if stopped > 0 {
            debug!(schedulers = stopped, "Schedule manager dropped; stopping its schedulers");
        }
    }
}

/// `key` if unused, otherwise the first free `key#n` with `n >= 2`.
fn free_key(events: &BTreeMap<String, RecurringScheduler>, key: String) -> String {
    if !events.contains_key(&key) {
        return key;
    }
    let mut n = 2_u64;
    loop {
        let candidate = format!("{key}#{n}");
        if !events.contains_key(&candidate) {
            debug!(
                key = %key,
                registered_as = %candidate,
                "Scheduler key taken; registering under a suffix"
            );
            return candidate;
        }
        n += 1;
    }
}

impl std::fmt::Debug for ScheduleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleManager")
            .field("events", &*self.events.read())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
