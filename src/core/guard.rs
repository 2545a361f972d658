//! Pool guard: periodic saturation checks with thread snapshots.
//!
//! A [`PoolGuard`] owns a [`NamedScheduler`]. Every tick it samples the
//! observed pool's backlog, asks the predicate whether the pool looks
//! unhealthy, and if so captures a [`ThreadSnapshot`] and hands
//! `(backlog, rendered_snapshot)` to the listener.
//!
//! Ticks run sequentially on the scheduler thread, so a slow predicate or
//! listener delays the next check. Panics in either are caught, logged, and
//! counted; they never stop the guard.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_pool_guard::config::Schedule;
//! use prometheus_pool_guard::core::{backlog_fn, NoopProfiler, PoolGuard};
//! use prometheus_pool_guard::util::DynamicProperty;
//!
//! let schedule = DynamicProperty::of(Schedule::with_delay(Duration::from_secs(5)));
//! let guard = PoolGuard::new(
//!     Arc::new(NoopProfiler),
//!     schedule.clone(),
//!     backlog_fn(|| 0),
//!     || true,
//!     |backlog, dump| tracing::warn!(backlog, "pool saturated:\n{dump}"),
//! )?;
//!
//! // Tighten the check interval at runtime; applies from the next tick.
//! schedule.set(Schedule::with_delay(Duration::from_secs(1)));
//! guard.close();
//! # Ok::<(), prometheus_pool_guard::core::GuardError>(())
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::builders::PoolGuardBuilder;
use crate::config::Schedule;
use crate::core::profiler::{metric_name, ProfiledCall, Profiler};
use crate::core::scheduler::NamedScheduler;
use crate::core::{BacklogSource, GuardError, ThreadIntrospector, ThreadSnapshot, TickError};
use crate::util::{panic_message, DynamicProperty};

/// Lifecycle state of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardState {
    /// Ticks are being scheduled.
    Running,
    /// Closed; no further ticks. Terminal.
    Stopped,
}

/// Resolved construction parameters, produced by [`PoolGuardBuilder`].
pub(crate) struct GuardSettings {
    pub name: String,
    pub profiler: Arc<dyn Profiler>,
    pub schedule: DynamicProperty<Schedule>,
    pub max_stack_depth: usize,
    pub initial_delay: Duration,
    pub shutdown_timeout: Duration,
    pub introspector: Arc<dyn ThreadIntrospector>,
}

/// Background watchdog over a worker pool's backlog.
///
/// Starts on construction; stops on [`close`](Self::close) or drop.
pub struct PoolGuard {
    name: String,
    scheduler: NamedScheduler,
    stopped: Arc<AtomicBool>,
}

impl PoolGuard {
    /// Start a guard with default settings.
    ///
    /// `predicate` gates snapshot capture on each tick; `listener` receives
    /// the backlog observed on that tick and the rendered snapshot.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::SchedulerStart` if the scheduler thread cannot
    /// be started.
    pub fn new<B, P, L>(
        profiler: Arc<dyn Profiler>,
        schedule: DynamicProperty<Schedule>,
        pool: B,
        predicate: P,
        listener: L,
    ) -> Result<Self, GuardError>
    where
        B: BacklogSource + 'static,
        P: Fn() -> bool + Send + 'static,
        L: Fn(usize, &str) + Send + 'static,
    {
        PoolGuardBuilder::new(profiler, schedule).build(pool, predicate, listener)
    }

    /// Builder exposing the optional settings.
    #[must_use]
    pub fn builder(profiler: Arc<dyn Profiler>, schedule: DynamicProperty<Schedule>) -> PoolGuardBuilder {
        PoolGuardBuilder::new(profiler, schedule)
    }

    pub(crate) fn start<B, P, L>(
        settings: GuardSettings,
        pool: B,
        predicate: P,
        listener: L,
    ) -> Result<Self, GuardError>
    where
        B: BacklogSource + 'static,
        P: Fn() -> bool + Send + 'static,
        L: Fn(usize, &str) + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let tick = GuardTick {
            metrics: GuardMetrics::new(&settings.name),
            name: settings.name.clone(),
            pool,
            predicate,
            listener,
            introspector: settings.introspector,
            profiler: Arc::clone(&settings.profiler),
            max_stack_depth: settings.max_stack_depth,
            stopped: Arc::clone(&stopped),
        };

        let scheduler = NamedScheduler::spawn(
            settings.name.clone(),
            settings.profiler,
            settings.schedule,
            settings.initial_delay,
            move || tick.run(),
        )?
        .with_shutdown_timeout(settings.shutdown_timeout);

        info!(
            guard = %settings.name,
            max_stack_depth = settings.max_stack_depth,
            "pool guard started"
        );

        Ok(Self {
            name: settings.name,
            scheduler,
            stopped,
        })
    }

    /// Guard name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> GuardState {
        if self.stopped.load(Ordering::Acquire) {
            GuardState::Stopped
        } else {
            GuardState::Running
        }
    }

    /// Stop scheduling ticks and release the scheduler thread.
    ///
    /// Idempotent; safe from any thread, including from inside the listener.
    /// A tick already in progress finishes but skips any predicate or
    /// listener call it has not started yet. Waits at most the configured
    /// shutdown timeout.
    pub fn close(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(guard = %self.name, "closing pool guard");
        self.scheduler.shutdown();
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        self.close();
    }
}

struct GuardMetrics {
    predicate_error: String,
    listener_error: String,
    snapshot: String,
    snapshot_skipped: String,
    capture: String,
}

impl GuardMetrics {
    fn new(name: &str) -> Self {
        let metric = |m: &str| metric_name("pool_guard", name, m);
        Self {
            predicate_error: metric("predicate_error"),
            listener_error: metric("listener_error"),
            snapshot: metric("snapshot"),
            snapshot_skipped: metric("snapshot_skipped"),
            capture: metric("capture"),
        }
    }
}

struct GuardTick<B, P, L> {
    name: String,
    pool: B,
    predicate: P,
    listener: L,
    introspector: Arc<dyn ThreadIntrospector>,
    profiler: Arc<dyn Profiler>,
    max_stack_depth: usize,
    stopped: Arc<AtomicBool>,
    metrics: GuardMetrics,
}

impl<B, P, L> GuardTick<B, P, L>
where
    B: BacklogSource,
    P: Fn() -> bool,
    L: Fn(usize, &str),
{
    fn run(&self) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let _frame = crate::frame!("PoolGuard::tick");

        let backlog = self.pool.backlog();
        if !self.evaluate_predicate() {
            trace!(guard = %self.name, backlog, "predicate false");
            return;
        }

        let snapshot = {
            let _frame = crate::frame!("ThreadSnapshot::capture");
            let _call = ProfiledCall::start(self.profiler.as_ref(), &self.metrics.capture);
            ThreadSnapshot::capture(self.introspector.as_ref(), self.max_stack_depth)
        };
        self.profiler.increment(&self.metrics.snapshot, 1);
        if snapshot.skipped() > 0 {
            let err = TickError::SnapshotPartial {
                skipped: snapshot.skipped(),
            };
            self.profiler
                .increment(&self.metrics.snapshot_skipped, snapshot.skipped() as u64);
            debug!(guard = %self.name, error = %err, "snapshot is partial");
        }
        let text = snapshot.render();

        if self.stopped.load(Ordering::Acquire) {
            debug!(guard = %self.name, "guard closed while capturing; snapshot dropped");
            return;
        }

        info!(
            guard = %self.name,
            backlog,
            threads = snapshot.len(),
            snapshot_id = %snapshot.id(),
            "pool guard triggered; delivering thread snapshot"
        );
        let listener = &self.listener;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(backlog, &text))) {
            let err = TickError::Listener(panic_message(payload.as_ref()));
            self.profiler.increment(&self.metrics.listener_error, 1);
            warn!(guard = %self.name, error = %err, "listener failed; guard keeps running");
        }
    }

    fn evaluate_predicate(&self) -> bool {
        let predicate = &self.predicate;
        match panic::catch_unwind(AssertUnwindSafe(|| predicate())) {
            Ok(triggered) => triggered,
            Err(payload) => {
                let err = TickError::Predicate(panic_message(payload.as_ref()));
                self.profiler.increment(&self.metrics.predicate_error, 1);
                warn!(guard = %self.name, error = %err, "predicate failed; treating as false");
                false
            }
        }
    }
}
