//! Native implementation of `WorkerPool` using OS threads.
//!
//! Each worker is a named OS thread with its own single-threaded tokio
//! runtime, so executor work never blocks the caller's runtime.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel recv; results use per-task channels
//! - **Observable**: workers register with the thread registry, publish
//!   `WAITING` while idle and `RUNNABLE` plus a task frame while executing
//! - **Resizable**: the maximum pool size may change at runtime; growing
//!   spawns workers, shrinking retires idle ones and lets busy ones finish
//! - **Clean shutdown**: dropping the sender unblocks workers naturally

use std::cmp::Ordering as SizeOrdering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::backlog::BacklogSource;
use crate::core::executor::WorkerExecutor;
use crate::core::profiler::{metric_name, ProfiledCall, Profiler};
use crate::core::ThreadState;
use crate::infra::threads::{enter_state, ThreadRegistry};
use crate::util::clock::now_ms;
use crate::util::{panic_message, DynamicProperty};

use super::{PoolCounters, PoolError, PoolStats, TaskHandle, TaskMetadata};

/// How long `shutdown` waits for each worker before detaching it.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How often a pool built on a shared size property re-reads it.
const RESIZE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A task queued for a worker.
struct WorkerTask<P, R> {
    payload: P,
    meta: TaskMetadata,
    reply: Sender<R>,
    enqueued_at: Instant,
}

/// What an idle worker picked up.
enum Next<P, R> {
    Task(WorkerTask<P, R>),
    Retire,
    Closed,
}

/// Metric names for one pool.
struct PoolMetrics {
    queue: String,
    active_threads: String,
    pool_size: String,
    max_pool_size: String,
    await_call: String,
    run_call: String,
    task_panic: String,
}

impl PoolMetrics {
    fn new(pool: &str) -> Self {
        let metric = |m: &str| metric_name("pool", pool, m);
        Self {
            queue: metric("queue"),
            active_threads: metric("activeThreads"),
            pool_size: metric("poolSize"),
            max_pool_size: metric("maxPoolSize"),
            await_call: metric("await"),
            run_call: metric("run"),
            task_panic: metric("task_panic"),
        }
    }
}

/// Everything a worker thread needs.
struct WorkerContext<P, R, E> {
    worker_id: usize,
    task_rx: Receiver<WorkerTask<P, R>>,
    retire_rx: Receiver<()>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
    executor: E,
    profiler: Arc<dyn Profiler>,
    metrics: Arc<PoolMetrics>,
    registry: Arc<ThreadRegistry>,
}

/// Worker spawning state, shared by the pool and its resize thread.
struct Crew<P, R, E> {
    config: WorkerPoolConfig,
    task_rx: Receiver<WorkerTask<P, R>>,
    /// One message retires one idle worker.
    retire_tx: Sender<()>,
    retire_rx: Receiver<()>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
    executor: E,
    profiler: Arc<dyn Profiler>,
    metrics: Arc<PoolMetrics>,
    registry: Arc<ThreadRegistry>,
    /// Worker handles. Held for the whole of a resize.
    threads: Mutex<Vec<JoinHandle<()>>>,
    /// Current maximum pool size.
    max_pool_size: Arc<AtomicUsize>,
    next_worker_id: AtomicUsize,
}

impl<P, R, E> Crew<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Spawn one worker and track its handle.
    fn spawn(&self, threads: &mut Vec<JoinHandle<()>>) -> std::io::Result<()> {
        let ctx = WorkerContext {
            worker_id: self.next_worker_id.fetch_add(1, Ordering::Relaxed),
            task_rx: self.task_rx.clone(),
            retire_rx: self.retire_rx.clone(),
            counters: Arc::clone(&self.counters),
            shutdown: Arc::clone(&self.shutdown),
            executor: self.executor.clone(),
            profiler: Arc::clone(&self.profiler),
            metrics: Arc::clone(&self.metrics),
            registry: Arc::clone(&self.registry),
        };
        // Counted before the thread starts so its exit never underflows.
        self.counters.live_workers.fetch_add(1, Ordering::Relaxed);
        match spawn_worker(&self.config, ctx) {
            Ok(handle) => {
                threads.push(handle);
                Ok(())
            }
            Err(e) => {
                self.counters.live_workers.fetch_sub(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Grow or shrink the pool to `size` workers.
    fn resize(&self, size: usize) -> Result<(), PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidConfig(
                "max_pool_size must be greater than 0".into(),
            ));
        }

        let mut threads = self.threads.lock();
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }
        threads.retain(|handle| !handle.is_finished());

        let current = self.max_pool_size.load(Ordering::Acquire);
        match size.cmp(&current) {
            SizeOrdering::Equal => return Ok(()),
            SizeOrdering::Greater => {
                // The maximum rises before the workers that fill it start.
                self.max_pool_size.store(size, Ordering::Release);
                for spawned in current..size {
                    if let Err(e) = self.spawn(&mut threads) {
                        self.max_pool_size.store(spawned, Ordering::Release);
                        return Err(PoolError::Internal(format!("failed to spawn worker: {e}")));
                    }
                }
            }
            SizeOrdering::Less => {
                // Workers retire before the maximum drops; busy ones finish first.
                for _ in size..current {
                    let _ = self.retire_tx.send(());
                }
                self.max_pool_size.store(size, Ordering::Release);
            }
        }

        info!(pool = %self.config.name, from = current, to = size, "Worker pool resized");
        Ok(())
    }
}

/// Worker pool with dedicated OS threads for CPU/GPU-bound work.
///
/// # Design
///
/// - **No polling**: workers block on channel recv
/// - **Clean shutdown**: dropping the sender unblocks all workers
/// - **Lock-free fast path**: atomic counters; the sender mutex is held only
///   for the enqueue
/// - **Reloadable size**: built with
///   [`with_max_pool_size`](Self::with_max_pool_size), the pool follows a
///   shared [`DynamicProperty`]
pub struct WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Workers and the state needed to spawn more.
    crew: Arc<Crew<P, R, E>>,

    /// Task sender (to workers). Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<WorkerTask<P, R>>>>,

    /// Task ID counter (lock-free atomic).
    task_id_counter: AtomicU64,

    /// Requested maximum pool size.
    size: DynamicProperty<usize>,

    /// Thread following `size`, and the sender whose drop stops it.
    resizer: Mutex<Option<(JoinHandle<()>, Sender<()>)>>,
}

impl<P, R, E> WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    /// Create a pool whose workers register with the global thread registry.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Internal` if a worker thread cannot be spawned
    pub fn new(
        config: WorkerPoolConfig,
        executor: E,
        profiler: Arc<dyn Profiler>,
    ) -> Result<Self, PoolError> {
        Self::with_registry(config, executor, profiler, Arc::clone(ThreadRegistry::global()))
    }

    /// Create a pool whose workers register with `registry`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_registry(
        config: WorkerPoolConfig,
        executor: E,
        profiler: Arc<dyn Profiler>,
        registry: Arc<ThreadRegistry>,
    ) -> Result<Self, PoolError> {
        let size = DynamicProperty::of(config.worker_count);
        Self::start(config, executor, profiler, registry, size, false)
    }

    /// Create a pool sized by `max_pool_size` instead of
    /// `config.worker_count`.
    ///
    /// The pool re-reads the property every 50ms and grows or shrinks to
    /// match. A value of zero is logged and ignored.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new); an initial size of zero is
    /// `PoolError::InvalidConfig`.
    pub fn with_max_pool_size(
        config: WorkerPoolConfig,
        executor: E,
        profiler: Arc<dyn Profiler>,
        max_pool_size: DynamicProperty<usize>,
    ) -> Result<Self, PoolError> {
        let config = config.with_worker_count(max_pool_size.get());
        Self::start(
            config,
            executor,
            profiler,
            Arc::clone(ThreadRegistry::global()),
            max_pool_size,
            true,
        )
    }

    fn start(
        config: WorkerPoolConfig,
        executor: E,
        profiler: Arc<dyn Profiler>,
        registry: Arc<ThreadRegistry>,
        size: DynamicProperty<usize>,
        follow_size: bool,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (task_tx, task_rx) = bounded::<WorkerTask<P, R>>(config.max_queue_depth);
        let (retire_tx, retire_rx) = unbounded();
        let worker_count = config.worker_count;
        let crew = Arc::new(Crew {
            metrics: Arc::new(PoolMetrics::new(&config.name)),
            config,
            task_rx,
            retire_tx,
            retire_rx,
            counters: Arc::new(PoolCounters::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            executor,
            profiler,
            registry,
            threads: Mutex::new(Vec::with_capacity(worker_count)),
            max_pool_size: Arc::new(AtomicUsize::new(worker_count)),
            next_worker_id: AtomicUsize::new(0),
        });

        {
            let mut threads = crew.threads.lock();
            for worker_id in 0..worker_count {
                if let Err(e) = crew.spawn(&mut threads) {
                    // Workers already started exit once the sender is dropped.
                    crew.shutdown.store(true, Ordering::Release);
                    return Err(PoolError::Internal(format!(
                        "failed to spawn worker {worker_id}: {e}"
                    )));
                }
            }
        }

        let resizer = if follow_size {
            let (stop_tx, stop_rx) = bounded::<()>(0);
            match spawn_resizer(Arc::clone(&crew), size.clone(), stop_rx) {
                Ok(handle) => Some((handle, stop_tx)),
                Err(e) => {
                    crew.shutdown.store(true, Ordering::Release);
                    return Err(PoolError::Internal(format!(
                        "failed to spawn resize thread: {e}"
                    )));
                }
            }
        } else {
            None
        };

        attach_indicators(&crew);

        info!(
            pool = %crew.config.name,
            worker_count,
            max_queue_depth = crew.config.max_queue_depth,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(Self {
            crew,
            task_tx: Mutex::new(Some(task_tx)),
            task_id_counter: AtomicU64::new(0),
            size,
            resizer: Mutex::new(resizer),
        })
    }

    /// Submit a task from an async context.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn submit_async(&self, payload: P) -> Result<TaskHandle<R>, PoolError> {
        // Enqueue never blocks.
        self.submit(payload)
    }

    /// Submit a task.
    ///
    /// The enqueue is non-blocking; it fails immediately if the queue is full.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the task queue is full
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    pub fn submit(&self, payload: P) -> Result<TaskHandle<R>, PoolError> {
        let counters = &self.crew.counters;
        if self.crew.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let task_id = self.task_id_counter.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = bounded(1);
        let task = WorkerTask {
            payload,
            meta: TaskMetadata {
                id: task_id,
                submitted_at_ms: now_ms(),
            },
            reply: reply_tx,
            enqueued_at: Instant::now(),
        };

        let task_tx_guard = self.task_tx.lock();
        let Some(task_tx) = task_tx_guard.as_ref() else {
            return Err(PoolError::PoolShutdown);
        };

        // Count before sending so a fast worker never decrements below zero.
        counters.queued_tasks.fetch_add(1, Ordering::Relaxed);
        match task_tx.try_send(task) {
            Ok(()) => {
                counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(pool = %self.crew.config.name, task_id, "Task submitted to worker pool");
                Ok(TaskHandle {
                    id: task_id,
                    rx: reply_rx,
                })
            }
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
                warn!(pool = %self.crew.config.name, "Worker pool queue is full");
                Err(PoolError::QueueFull)
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                Err(PoolError::PoolShutdown)
            }
        }
    }

    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.crew.config.name
    }

    /// Tasks waiting for a worker.
    #[must_use]
    pub fn queued(&self) -> u64 {
        self.crew.counters.queued_tasks.load(Ordering::Relaxed)
    }

    /// Get current pool statistics. `worker_count` is the number of live
    /// worker threads.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.crew.counters.snapshot()
    }

    /// Current maximum pool size.
    #[must_use]
    pub fn max_pool_size(&self) -> usize {
        self.crew.max_pool_size.load(Ordering::Acquire)
    }

    /// Change the maximum pool size now.
    ///
    /// Growing spawns workers immediately. Shrinking retires idle workers
    /// at once and busy ones after their current task. The pool's size
    /// property is updated too.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `size` is zero
    /// - `PoolError::PoolShutdown` if the pool has been shut down
    /// - `PoolError::Internal` if a worker thread cannot be spawned
    pub fn set_max_pool_size(&self, size: usize) -> Result<(), PoolError> {
        self.crew.resize(size)?;
        self.size.set(size);
        Ok(())
    }

    /// Shut down the pool gracefully.
    ///
    /// Drops the task sender to unblock idle workers, then waits up to two
    /// seconds per worker. Workers still busy after that are detached.
    pub fn shutdown(&self) {
        if self.crew.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        let name = &self.crew.config.name;
        info!(pool = %name, "Shutting down worker pool");

        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }
        detach_indicators(&self.crew);

        // Stop resizing before collecting the workers it may have spawned.
        if let Some((resizer, stop_tx)) = self.resizer.lock().take() {
            drop(stop_tx);
            let outcome = join_within(resizer, WORKER_JOIN_TIMEOUT);
            if outcome != Joined::Clean {
                warn!(pool = %name, ?outcome, "Resize thread did not stop cleanly");
            }
        }

        let mut workers = self.crew.threads.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            match join_within(worker, WORKER_JOIN_TIMEOUT) {
                Joined::Clean => debug!(worker_id = idx, "Worker joined successfully"),
                Joined::Panicked => warn!(worker_id = idx, "Worker panicked"),
                Joined::TimedOut => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                }
            }
        }

        info!(pool = %name, worker_count, "Worker pool shut down complete");
    }
}

impl<P, R, E> BacklogSource for WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    fn backlog(&self) -> usize {
        usize::try_from(self.queued()).unwrap_or(usize::MAX)
    }
}

impl<P, R, E> Drop for WorkerPool<P, R, E>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    fn drop(&mut self) {
        // Signal shutdown but don't join: workers may still be running tasks.
        if !self.crew.shutdown.swap(true, Ordering::AcqRel) {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
            // Dropping the stop sender ends the resize thread.
            drop(self.resizer.lock().take());
            detach_indicators(&self.crew);
            debug!(pool = %self.crew.config.name, "WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

/// How a bounded join ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joined {
    Clean,
    Panicked,
    TimedOut,
}

/// Join `handle`, giving up after `timeout`.
///
/// A helper thread turns the blocking join into a bounded wait.
fn join_within(handle: JoinHandle<()>, timeout: Duration) -> Joined {
    let (tx, rx) = bounded(1);
    let joiner = thread::spawn(move || {
        let _ = tx.send(handle.join().is_ok());
    });
    match rx.recv_timeout(timeout) {
        Ok(clean) => {
            let _ = joiner.join();
            if clean {
                Joined::Clean
            } else {
                Joined::Panicked
            }
        }
        Err(_) => Joined::TimedOut,
    }
}

/// Follow `size` until `stop_rx` disconnects.
fn spawn_resizer<P, R, E>(
    crew: Arc<Crew<P, R, E>>,
    size: DynamicProperty<usize>,
    stop_rx: Receiver<()>,
) -> std::io::Result<JoinHandle<()>>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    thread::Builder::new()
        .name(format!("{}-resize", crew.config.name))
        .spawn(move || {
            let mut seen = size.get();
            while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(RESIZE_POLL_INTERVAL) {
                let wanted = size.get();
                if wanted == seen {
                    continue;
                }
                seen = wanted;
                if let Err(e) = crew.resize(wanted) {
                    warn!(pool = %crew.config.name, size = wanted, error = %e, "Ignoring pool size change");
                }
            }
            debug!(pool = %crew.config.name, "Resize thread exiting");
        })
}

fn attach_indicators<P, R, E>(crew: &Crew<P, R, E>) {
    let profiler = crew.profiler.as_ref();
    let metrics = &crew.metrics;

    let queued = Arc::clone(&crew.counters);
    profiler.attach_indicator(
        &metrics.queue,
        Box::new(move || gauge(queued.queued_tasks.load(Ordering::Relaxed))),
    );
    let active = Arc::clone(&crew.counters);
    profiler.attach_indicator(
        &metrics.active_threads,
        Box::new(move || gauge(active.active_tasks.load(Ordering::Relaxed))),
    );
    let live = Arc::clone(&crew.counters);
    profiler.attach_indicator(
        &metrics.pool_size,
        Box::new(move || gauge(live.live_workers.load(Ordering::Relaxed))),
    );
    let max = Arc::clone(&crew.max_pool_size);
    profiler.attach_indicator(
        &metrics.max_pool_size,
        Box::new(move || i64::try_from(max.load(Ordering::Acquire)).unwrap_or(i64::MAX)),
    );
}

fn detach_indicators<P, R, E>(crew: &Crew<P, R, E>) {
    let profiler = crew.profiler.as_ref();
    profiler.detach_indicator(&crew.metrics.queue);
    profiler.detach_indicator(&crew.metrics.active_threads);
    profiler.detach_indicator(&crew.metrics.pool_size);
    profiler.detach_indicator(&crew.metrics.max_pool_size);
}

fn gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Spawn a worker thread named `<pool>-<worker_id>`.
fn spawn_worker<P, R, E>(
    config: &WorkerPoolConfig,
    ctx: WorkerContext<P, R, E>,
) -> std::io::Result<JoinHandle<()>>
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    thread::Builder::new()
        .name(format!("{}-{}", config.name, ctx.worker_id))
        .stack_size(config.thread_stack_size)
        .spawn(move || run_worker(ctx))
}

/// Decrements the live worker count when the worker thread ends.
struct LiveWorker(Arc<PoolCounters>);

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.0.live_workers.fetch_sub(1, Ordering::Relaxed);
    }
}

fn run_worker<P, R, E>(ctx: WorkerContext<P, R, E>)
where
    P: Send + 'static,
    R: Send + 'static,
    E: WorkerExecutor<P, R>,
{
    let worker_id = ctx.worker_id;
    let _live = LiveWorker(Arc::clone(&ctx.counters));
    let _registration = ctx.registry.register_current();
    debug!(worker_id, "Worker thread started");

    // Each worker has its own single-threaded tokio runtime
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(worker_id, error = %e, "Failed to create worker runtime");
            return;
        }
    };

    loop {
        // Blocks until work or a retire message arrives.
        let next = {
            let _idle = enter_state(ThreadState::Waiting);
            let _frame = crate::frame!("WorkerPool::await_task");
            select! {
                recv(ctx.task_rx) -> task => task.map_or(Next::Closed, Next::Task),
                recv(ctx.retire_rx) -> retire => retire.map_or(Next::Closed, |()| Next::Retire),
            }
        };
        let task = match next {
            Next::Task(task) => task,
            Next::Retire => {
                debug!(worker_id, "Worker retired by pool resize");
                break;
            }
            Next::Closed => {
                debug!(worker_id, "Worker channel closed, exiting");
                break;
            }
        };

        ctx.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
        if ctx.shutdown.load(Ordering::Acquire) {
            debug!(worker_id, "Worker shutdown during task, exiting");
            break;
        }

        ctx.counters.active_tasks.fetch_add(1, Ordering::Relaxed);
        ctx.profiler
            .record_call(&ctx.metrics.await_call, task.enqueued_at.elapsed());

        let task_id = task.meta.id;
        debug!(worker_id, task_id, "Worker executing task");

        let outcome = {
            let _frame = crate::frame!(format!("WorkerExecutor::execute(task={task_id})"));
            let _call = ProfiledCall::start(ctx.profiler.as_ref(), &ctx.metrics.run_call);
            let executor = &ctx.executor;
            let payload = task.payload;
            let meta = task.meta;
            panic::catch_unwind(AssertUnwindSafe(|| rt.block_on(executor.execute(payload, meta))))
        };

        match outcome {
            Ok(result) => {
                // The caller may have dropped its handle.
                let _ = task.reply.send(result);
                ctx.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id, task_id, "Worker completed task");
            }
            Err(payload) => {
                ctx.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                ctx.profiler.increment(&ctx.metrics.task_panic, 1);
                error!(
                    worker_id,
                    task_id,
                    panic = %panic_message(payload.as_ref()),
                    "Executor panicked"
                );
            }
        }
        ctx.counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
    }

    debug!(worker_id, "Worker thread exiting");
}
