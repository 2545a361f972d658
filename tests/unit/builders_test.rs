//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use prometheus_pool_guard::builders::PoolGuardBuilder;
use prometheus_pool_guard::config::{GuardConfig, Schedule};
use prometheus_pool_guard::core::{backlog_fn, GuardError, GuardState, NoopProfiler};
use prometheus_pool_guard::infra::ThreadRegistry;
use prometheus_pool_guard::util::DynamicProperty;

#[test]
fn test_builder_from_config_rejects_invalid() {
    let mut cfg = GuardConfig::default();
    cfg.max_stack_depth = 0;
    let err = PoolGuardBuilder::from_config(Arc::new(NoopProfiler), &cfg).err().unwrap();
    assert!(matches!(err, GuardError::InvalidConfig(_)));
}

#[test]
fn test_builder_rejects_empty_name() {
    let schedule = DynamicProperty::of(Schedule::default());
    let err = PoolGuardBuilder::new(Arc::new(NoopProfiler), schedule)
        .name("")
        .build(backlog_fn(|| 0), || false, |_, _| {})
        .err()
        .unwrap();
    assert!(matches!(err, GuardError::InvalidConfig(_)));
}

#[test]
fn test_builder_starts_named_guard() {
    let schedule = DynamicProperty::of(Schedule::with_delay(Duration::from_secs(60)));
    let guard = PoolGuardBuilder::new(Arc::new(NoopProfiler), schedule)
        .name("builder-guard")
        .initial_delay(Duration::from_secs(60))
        .introspector(Arc::new(ThreadRegistry::new()))
        .build(backlog_fn(|| 0), || false, |_, _| {})
        .unwrap();

    assert_eq!(guard.name(), "builder-guard");
    assert_eq!(guard.state(), GuardState::Running);
    guard.close();
    assert_eq!(guard.state(), GuardState::Stopped);
}

#[test]
fn test_builder_schedule_handle_is_shared() {
    let cfg = GuardConfig::default();
    let builder = PoolGuardBuilder::from_config(Arc::new(NoopProfiler), &cfg).unwrap();
    let handle = builder.schedule();
    handle.set(Schedule::with_rate(Duration::from_millis(20)));
    assert_eq!(builder.schedule().get(), Schedule::with_rate(Duration::from_millis(20)));
}

#[test]
fn test_builder_accepts_unbounded_initial_delay() {
    let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let guard = PoolGuardBuilder::new(
        Arc::new(NoopProfiler),
        DynamicProperty::of(Schedule::with_delay(Duration::from_millis(10))),
    )
    .name("never-due")
    .initial_delay(Duration::MAX)
    .introspector(Arc::new(ThreadRegistry::new()))
    .build(
        backlog_fn(|| 0),
        move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            false
        },
        |_, _| {},
    )
    .unwrap();

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(guard.state(), GuardState::Running);
    assert_eq!(ticks.load(std::sync::atomic::Ordering::SeqCst), 0);

    let start = std::time::Instant::now();
    guard.close();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(guard.state(), GuardState::Stopped);
}
