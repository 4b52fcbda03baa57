//! Caller-facing runtime: the task facade and its scoped guard.

pub mod tasks;

pub use tasks::{ConcurrentTasks, TaskScope};
