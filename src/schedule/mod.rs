//! Recurring background jobs, their registry, and completion watchers.

pub mod manager;
pub mod recurring;
pub mod watcher;

pub use manager::ScheduleManager;
pub use recurring::{JobFn, RecurringBuilder, RecurringScheduler, SchedulerState};
pub use watcher::{CompletionCallback, CompletionSource, CompletionWatcher};
