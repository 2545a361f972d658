//! Tests for thread introspection backends

use std::sync::{Arc, Barrier};
use std::thread;

use prometheus_pool_guard::core::{ThreadIntrospector, ThreadSnapshot, ThreadState};
use prometheus_pool_guard::frame;
use prometheus_pool_guard::infra::threads::{enter_state, ThreadRegistry};

#[test]
fn test_registry_snapshot_of_parked_threads() {
    let registry = Arc::new(ThreadRegistry::new());
    let ready = Arc::new(Barrier::new(3));
    let release = Arc::new(Barrier::new(3));

    let workers: Vec<_> = (0..2)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let ready = Arc::clone(&ready);
            let release = Arc::clone(&release);
            thread::spawn(move || {
                let _registration = registry.register_current_as(format!("parked-{i}"));
                let _frame = frame!("wait_for_release");
                let _state = enter_state(ThreadState::Waiting);
                ready.wait();
                release.wait();
            })
        })
        .collect();

    ready.wait();
    let snapshot = ThreadSnapshot::capture(registry.as_ref(), 8);
    release.wait();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(snapshot.len(), 2);
    let text = snapshot.render();
    assert!(text.contains("\"parked-0\" WAITING\n    at wait_for_release @ "));
    assert!(text.contains("\"parked-1\" WAITING\n    at wait_for_release @ "));
    assert!(registry.is_empty());
}

#[test]
fn test_registry_handles_go_stale_after_exit() {
    let registry = Arc::new(ThreadRegistry::new());
    let handle = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.register_current_as("short-lived").handle())
            .join()
            .unwrap()
    };
    assert!(registry.inspect(handle, 8).is_none());
}

#[cfg(target_os = "linux")]
#[test]
fn test_procfs_lists_current_thread() {
    use prometheus_pool_guard::infra::threads::ProcfsIntrospector;

    if !ProcfsIntrospector::is_available() {
        return;
    }
    let snapshot = ThreadSnapshot::capture(&ProcfsIntrospector::new(), 16);
    assert!(!snapshot.is_empty());
    assert!(snapshot.render().lines().any(|line| line.starts_with('"')));
}
