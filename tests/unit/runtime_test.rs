//! Tests for tokio runtime adapters

use std::sync::Arc;
use std::time::Duration;

use prometheus_pool_guard::core::{BacklogSource, NoopProfiler, PoolGuard};
use prometheus_pool_guard::config::Schedule;
use prometheus_pool_guard::infra::ThreadRegistry;
use prometheus_pool_guard::runtime::TokioRuntimeBacklog;
use prometheus_pool_guard::util::DynamicProperty;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_backlog_reports_current_runtime() {
    let backlog = TokioRuntimeBacklog::current().expect("inside a runtime");
    assert_eq!(backlog.num_workers(), 2);
    // Spawned from inside the runtime; lands in a local queue or runs at once.
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tx.send(backlog.backlog()).unwrap();
    });
    let _ = rx.await.expect("oneshot result");
}

#[test]
fn test_tokio_backlog_guarded() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();
    let (tx, rx) = crossbeam_channel::unbounded();

    let guard = PoolGuard::builder(
        Arc::new(NoopProfiler),
        DynamicProperty::of(Schedule::with_delay(Duration::from_millis(20))),
    )
    .name("tokio-guard")
    .introspector(Arc::new(ThreadRegistry::new()))
    .build(
        TokioRuntimeBacklog::new(rt.handle().clone()),
        || true,
        move |backlog, _dump| {
            let _ = tx.send(backlog);
        },
    )
    .unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 0);
    guard.close();
}
