//! Benchmarks for thread snapshots.
//!
//! Benchmarks cover:
//! - Capture over the in-process registry at several thread counts
//! - Text rendering of a captured snapshot
//! - Capture over procfs (Linux only)

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use prometheus_pool_guard::core::{ThreadSnapshot, ThreadState};
use prometheus_pool_guard::frame;
use prometheus_pool_guard::infra::threads::enter_state;
use prometheus_pool_guard::infra::ThreadRegistry;

// ============================================================================
// Fixture
// ============================================================================

/// Registered threads parked with a few frames each until dropped.
struct ParkedThreads {
    stop: Sender<()>,
    threads: Vec<JoinHandle<()>>,
}

impl ParkedThreads {
    fn spawn(registry: &Arc<ThreadRegistry>, count: usize, depth: usize) -> Self {
        let (stop, stopped) = crossbeam_channel::bounded::<()>(0);
        let ready = Arc::new(Barrier::new(count + 1));
        let threads = (0..count)
            .map(|i| {
                let registry = Arc::clone(registry);
                let ready = Arc::clone(&ready);
                let stopped = stopped.clone();
                thread::spawn(move || {
                    let _registration = registry.register_current_as(format!("bench-{i}"));
                    let _frames: Vec<_> = (0..depth).map(|d| frame!(format!("level{d}"))).collect();
                    let _state = enter_state(ThreadState::Waiting);
                    ready.wait();
                    let _ = stopped.recv();
                })
            })
            .collect();
        ready.wait();
        Self { stop, threads }
    }

    fn join(self) {
        drop(self.stop);
        for thread in self.threads {
            let _ = thread.join();
        }
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_registry_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_capture");

    for count in [4_usize, 32, 128] {
        let registry = Arc::new(ThreadRegistry::new());
        let parked = ParkedThreads::spawn(&registry, count, 16);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(ThreadSnapshot::capture(registry.as_ref(), 1000)));
        });

        parked.join();
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let registry = Arc::new(ThreadRegistry::new());
    let parked = ParkedThreads::spawn(&registry, 32, 32);
    let snapshot = ThreadSnapshot::capture(registry.as_ref(), 1000);

    c.bench_function("render_32_threads", |b| {
        b.iter(|| black_box(snapshot.render()));
    });

    parked.join();
}

#[cfg(target_os = "linux")]
fn bench_procfs_capture(c: &mut Criterion) {
    use prometheus_pool_guard::infra::threads::ProcfsIntrospector;

    if !ProcfsIntrospector::is_available() {
        return;
    }
    let introspector = ProcfsIntrospector::new();
    c.bench_function("procfs_capture", |b| {
        b.iter(|| black_box(ThreadSnapshot::capture(&introspector, 1000)));
    });
}

#[cfg(not(target_os = "linux"))]
fn bench_procfs_capture(_c: &mut Criterion) {}

criterion_group!(
    benches,
    bench_registry_capture,
    bench_render,
    bench_procfs_capture
);
criterion_main!(benches);
