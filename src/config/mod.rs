//! Configuration models for the worker pool and schedulers.

pub mod pool;

pub use pool::{PoolConfig, ScheduleConfig, TasksConfig, TimeUnit};
