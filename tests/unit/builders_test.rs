//! Tests for the runtime builder

use std::sync::Arc;
use taskgate::builders::ConcurrentTasksBuilder;
use taskgate::config::{PoolConfig, TasksConfig};
use taskgate::core::TaskError;
use taskgate::infra::InMemoryQueue;
use taskgate::runtime::ConcurrentTasks;
use taskgate::util::{DiagnosticLog, MemoryLog, SystemClock};

#[test]
fn test_builder_defaults() {
    let tasks = ConcurrentTasksBuilder::new().build().unwrap();
    assert_eq!(tasks.config(), &TasksConfig::default());
    assert_eq!(tasks.queued(), 0);
    assert!(tasks.pool_stats().is_none());
    assert!(tasks.schedules().is_empty());
}

#[test]
fn test_builder_with_collaborators() {
    let log = Arc::new(MemoryLog::new());
    let tasks = ConcurrentTasks::builder()
        .pool(PoolConfig::new().with_cores(1))
        .queue(Box::new(InMemoryQueue::new()))
        .log(Some(log.clone() as Arc<dyn DiagnosticLog>))
        .clock(Arc::new(SystemClock))
        .build()
        .unwrap();
    assert_eq!(tasks.configure().unwrap(), 2);
    tasks.shutdown(true);
    assert!(log.errors().is_empty());
}

#[test]
fn test_new_rejects_invalid_config() {
    let mut config = TasksConfig::default();
    config.schedule.completion_interval = 0.0;
    let err = ConcurrentTasks::new(config).unwrap_err();
    assert!(matches!(err, TaskError::Configuration(msg) if msg.contains("completion_interval")));
}
