//! Tests for configuration validation

use std::time::{Duration, Instant};

use prometheus_pool_guard::config::{
    GuardConfig, Schedule, ScheduleKind, WorkerPoolConfig, DEFAULT_MAX_STACK_DEPTH, MIN_PERIOD,
};

#[test]
fn test_guard_config_defaults() {
    let cfg = GuardConfig::default();
    assert_eq!(cfg.name, "thread-pool-guard");
    assert_eq!(cfg.schedule.kind, ScheduleKind::FixedDelay);
    assert_eq!(cfg.schedule.period(), Duration::from_secs(1));
    assert_eq!(cfg.max_stack_depth, DEFAULT_MAX_STACK_DEPTH);
    assert_eq!(cfg.initial_delay(), Duration::ZERO);
    assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(2));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_guard_config_invalid_values() {
    let mut cfg = GuardConfig::default();
    cfg.schedule.period_ms = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = GuardConfig::default();
    cfg.max_stack_depth = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = GuardConfig::default();
    cfg.name = "  ".into();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_guard_config_from_json_partial() {
    let cfg = GuardConfig::from_json_str(
        r#"{ "name": "io-guard", "schedule": { "kind": "fixed_rate", "period_ms": 250 } }"#,
    )
    .unwrap();
    assert_eq!(cfg.name, "io-guard");
    assert_eq!(cfg.schedule, Schedule::with_rate(Duration::from_millis(250)));
    assert_eq!(cfg.max_stack_depth, DEFAULT_MAX_STACK_DEPTH);
}

#[test]
fn test_guard_config_from_json_rejects_zero_period() {
    let err = GuardConfig::from_json_str(r#"{ "schedule": { "kind": "fixed_delay", "period_ms": 0 } }"#)
        .unwrap_err();
    assert!(err.contains("period_ms"));
}

#[test]
fn test_schedule_kind_parse() {
    assert_eq!("fixed_delay".parse::<ScheduleKind>().unwrap(), ScheduleKind::FixedDelay);
    assert_eq!("RATE".parse::<ScheduleKind>().unwrap(), ScheduleKind::FixedRate);
    assert!("cron".parse::<ScheduleKind>().is_err());
}

#[test]
fn test_schedule_next_start() {
    let started = Instant::now();
    let finished = started + Duration::from_millis(30);

    let delay = Schedule::with_delay(Duration::from_millis(100));
    assert_eq!(delay.next_start(started, finished), finished + Duration::from_millis(100));

    let rate = Schedule::with_rate(Duration::from_millis(100));
    assert_eq!(rate.next_start(started, finished), started + Duration::from_millis(100));

    let overrun = started + Duration::from_millis(150);
    assert_eq!(rate.next_start(started, overrun), overrun);
}

#[test]
fn test_schedule_zero_period_clamped() {
    let schedule = Schedule::with_delay(Duration::ZERO);
    assert_eq!(schedule.effective_period(), MIN_PERIOD);
}

#[test]
fn test_worker_pool_config_validation() {
    assert!(WorkerPoolConfig::new().validate().is_ok());
    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_max_queue_depth(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_thread_stack_size(1024).validate().is_err());
    assert!(WorkerPoolConfig::new().with_name("").validate().is_err());
}
