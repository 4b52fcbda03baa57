//! Tests for utility functions

use std::time::Duration;
use taskgate::util::{
    init_tracing, secs_to_duration, Clock, DiagnosticLog, LogLevel, MemoryLog, NullLog,
    SystemClock, TracingLog,
};

#[test]
fn test_memory_log_keeps_order_and_levels() {
    let log = MemoryLog::new();
    log.debug("waiting: 1/2 done");
    log.error("task 4 dropped");
    log.debug("all settled");

    assert_eq!(
        log.entries(),
        vec![
            (LogLevel::Debug, "waiting: 1/2 done".to_string()),
            (LogLevel::Error, "task 4 dropped".to_string()),
            (LogLevel::Debug, "all settled".to_string()),
        ]
    );
    assert_eq!(log.errors(), vec!["task 4 dropped".to_string()]);
    assert_eq!(log.debugs().len(), 2);
}

#[test]
fn test_other_sinks_accept_messages() {
    init_tracing();
    init_tracing();
    TracingLog.debug("tracing debug");
    TracingLog.error("tracing error");
    NullLog.debug("ignored");
    NullLog.error("ignored");
}

#[test]
fn test_system_clock_sleeps() {
    let clock = SystemClock;
    let start = clock.now();
    clock.sleep(Duration::from_millis(10));
    assert!(clock.now() - start >= Duration::from_millis(10));
}

#[test]
fn test_secs_to_duration_rejects_non_positive() {
    assert_eq!(secs_to_duration(1.5), Some(Duration::from_millis(1_500)));
    assert_eq!(secs_to_duration(-0.1), None);
}
