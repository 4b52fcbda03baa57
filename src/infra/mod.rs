//! Infrastructure adapters for task buffering.

pub mod queue;
pub use queue::InMemoryQueue;
