//! Builders to construct task runtimes from configuration.

pub mod tasks_builder;

pub use tasks_builder::ConcurrentTasksBuilder;
