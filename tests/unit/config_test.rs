//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;
use taskgate::config::{PoolConfig, ScheduleConfig, TasksConfig, TimeUnit};

#[test]
fn test_pool_config_validation() {
    assert!(PoolConfig::default().validate().is_ok());
    assert!(PoolConfig::new().with_max_workers_cap(0).validate().is_err());
    assert!(PoolConfig::new().with_cores(0).validate().is_err());
    assert!(PoolConfig::new().with_max_queue_depth(0).validate().is_err());

    let invalid = PoolConfig {
        thread_stack_size: 0,
        ..PoolConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_sizing() {
    let cfg = PoolConfig::new().with_cores(4);
    assert_eq!(cfg.max_workers(), 8);
    assert_eq!(cfg.submission_permits(), 7);

    let cfg = PoolConfig::new().with_cores(40);
    assert_eq!(cfg.max_workers(), 32);
    assert_eq!(cfg.submission_permits(), 31);

    assert!(PoolConfig::default().max_workers() >= 1);
}

#[test]
fn test_join_timeout_roundtrip() {
    let cfg = PoolConfig::new().with_shutdown_join_timeout(Duration::from_millis(750));
    assert_eq!(cfg.shutdown_join_timeout_ms, 750);
    assert_eq!(cfg.shutdown_join_timeout(), Duration::from_millis(750));
}

#[test]
fn test_schedule_config_validation() {
    let defaults = ScheduleConfig::default();
    assert!(defaults.validate().is_ok());
    assert!((defaults.default_interval - 5.0).abs() < f64::EPSILON);
    assert_eq!(defaults.default_unit, TimeUnit::Seconds);
    assert_eq!(defaults.default_limit, 999_999);

    let invalid = ScheduleConfig {
        default_interval: -1.0,
        ..ScheduleConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = ScheduleConfig {
        completion_interval: f64::NAN,
        ..ScheduleConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_time_unit_parse() {
    assert_eq!(TimeUnit::parse("seconds"), Some(TimeUnit::Seconds));
    assert_eq!(TimeUnit::parse("Minute"), Some(TimeUnit::Minutes));
    assert_eq!(TimeUnit::parse(" hours "), Some(TimeUnit::Hours));
    assert_eq!(TimeUnit::parse("day"), Some(TimeUnit::Days));
    assert_eq!(TimeUnit::parse("WEEKS"), Some(TimeUnit::Weeks));
    assert_eq!(TimeUnit::parse("fortnight"), None);
    assert_eq!(TimeUnit::Weeks.as_secs(), 7 * TimeUnit::Days.as_secs());
}

#[test]
fn test_tasks_config_from_json() {
    let cfg = TasksConfig::from_json_str(
        r#"{
            "pool": { "max_workers_cap": 4, "cores_override": 8 },
            "schedule": { "default_unit": "minutes", "completion_interval": 0.25 }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.pool.max_workers(), 4);
    assert_eq!(cfg.pool.thread_name_prefix, "taskgate-worker");
    assert_eq!(cfg.schedule.default_unit, TimeUnit::Minutes);
    assert!((cfg.schedule.completion_interval - 0.25).abs() < f64::EPSILON);
}

#[test]
fn test_tasks_config_from_json_rejects_invalid() {
    let err = TasksConfig::from_json_str(r#"{ "pool": { "max_workers_cap": 0 } }"#).unwrap_err();
    assert!(err.contains("pool invalid"));

    let err = TasksConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_tasks_config_from_lookup() {
    let vars: HashMap<&str, &str> = [
        ("TASKGATE_MAX_WORKERS_CAP", "6"),
        ("TASKGATE_CORES", "2"),
        ("TASKGATE_MAX_QUEUE_DEPTH", "128"),
        ("TASKGATE_UNIT", "hours"),
        ("TASKGATE_LIMIT", "12"),
        ("TASKGATE_COMPLETION_INTERVAL", "0.5"),
    ]
    .into_iter()
    .collect();

    let cfg = TasksConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
    assert_eq!(cfg.pool.max_workers(), 4);
    assert_eq!(cfg.pool.max_queue_depth, Some(128));
    assert_eq!(cfg.schedule.default_unit, TimeUnit::Hours);
    assert_eq!(cfg.schedule.default_limit, 12);
    assert!((cfg.schedule.default_interval - 5.0).abs() < f64::EPSILON);
}

#[test]
fn test_tasks_config_from_lookup_reports_bad_values() {
    let err = TasksConfig::from_lookup(|k| (k == "TASKGATE_CORES").then(|| "many".to_string()))
        .unwrap_err();
    assert!(err.contains("TASKGATE_CORES"));

    let err = TasksConfig::from_lookup(|k| (k == "TASKGATE_UNIT").then(|| "eons".to_string()))
        .unwrap_err();
    assert!(err.contains("unknown unit"));

    let err = TasksConfig::from_lookup(|k| (k == "TASKGATE_INTERVAL").then(|| "0".to_string()))
        .unwrap_err();
    assert!(err.contains("schedule invalid"));
}
