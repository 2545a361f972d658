//! Tests for error types

use std::error::Error as _;
use std::io;

use prometheus_pool_guard::core::{GuardError, SchedulerError, TickError};

#[test]
fn test_invalid_config_error() {
    let err = GuardError::InvalidConfig("name must not be empty".to_string());
    assert_eq!(format!("{}", err), "invalid configuration: name must not be empty");
}

#[test]
fn test_scheduler_spawn_converts_to_guard_error() {
    let err = SchedulerError::Spawn {
        name: "thread-pool-guard".to_string(),
        thread: "thread-pool-guard-0".to_string(),
        source: io::Error::new(io::ErrorKind::OutOfMemory, "no threads left"),
    };
    assert_eq!(
        format!("{}", err),
        "failed to spawn scheduler thread `thread-pool-guard-0`: no threads left"
    );

    let err = GuardError::from(err);
    assert_eq!(
        format!("{}", err),
        "failed to start scheduler `thread-pool-guard`: no threads left"
    );
    assert!(matches!(&err, GuardError::SchedulerStart { name, .. } if name == "thread-pool-guard"));
    assert!(err.source().is_some());
}

#[test]
fn test_tick_errors() {
    assert_eq!(
        TickError::Predicate("boom".into()).to_string(),
        "predicate panicked: boom"
    );
    assert_eq!(
        TickError::Listener("sink closed".into()).to_string(),
        "listener panicked: sink closed"
    );
    assert_eq!(
        TickError::SnapshotPartial { skipped: 2 }.to_string(),
        "2 thread(s) could not be inspected"
    );
}

#[cfg(feature = "tokio-runtime")]
#[test]
fn test_pool_shutdown_error() {
    let err = prometheus_pool_guard::core::PoolError::PoolShutdown;
    assert_eq!(format!("{}", err), "pool has been shut down");
}
