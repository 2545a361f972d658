//! Named single-thread scheduler driven by a reloadable schedule.
//!
//! One dedicated OS thread runs the task, sequentially: runs never overlap.
//! The schedule is re-read after every run, so a new period applies from
//! the next run on. Shutdown wakes the thread immediately if it is waiting
//! and waits a bounded time for a run that is still in progress.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, trace, warn};

use crate::config::guard::deadline_after;
use crate::config::Schedule;
use crate::core::profiler::{metric_name, ProfiledCall, Profiler};
use crate::core::{SchedulerError, ThreadState};
use crate::infra::threads::{enter_state, ThreadRegistry};
use crate::util::{panic_message, DynamicProperty};

/// Default bound on how long shutdown waits for an in-flight run.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

struct Shared {
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

impl Shared {
    /// Sleep until `deadline`. Returns `false` if shut down meanwhile.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wakeup.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        !*stopped
    }
}

/// Handle to a running scheduler thread.
///
/// The thread is named `<name>-0`, registers with the global
/// [`ThreadRegistry`], and records each run under `pool.<name>.run`.
pub struct NamedScheduler {
    name: String,
    shared: Arc<Shared>,
    worker: Mutex<Option<(JoinHandle<()>, Receiver<()>)>>,
    shutdown_timeout: Duration,
}

impl NamedScheduler {
    /// Start running `task` on a new thread, first after `initial_delay`,
    /// then according to the latest value of `schedule`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Spawn` if the thread cannot be created.
    pub fn spawn<F>(
        name: impl Into<String>,
        profiler: Arc<dyn Profiler>,
        schedule: DynamicProperty<Schedule>,
        initial_delay: Duration,
        mut task: F,
    ) -> Result<Self, SchedulerError>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let thread_name = format!("{name}-0");
        let shared = Arc::new(Shared {
            stopped: Mutex::new(false),
            wakeup: Condvar::new(),
        });
        // Never sent on; disconnects when the thread exits.
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        let thread_shared = Arc::clone(&shared);
        let run_metric = metric_name("pool", &name, "run");
        let panic_metric = metric_name("pool", &name, "task_panic");
        let log_name = name.clone();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let _done = done_tx;
                let _registration = ThreadRegistry::global().register_current();
                debug!(scheduler = %log_name, "scheduler thread started");

                let mut next_start = deadline_after(Instant::now(), initial_delay);
                loop {
                    let proceed = {
                        let _waiting = enter_state(ThreadState::TimedWaiting);
                        thread_shared.wait_until(next_start)
                    };
                    if !proceed {
                        break;
                    }

                    let started = Instant::now();
                    {
                        let _call = ProfiledCall::start(profiler.as_ref(), &run_metric);
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task())) {
                            profiler.increment(&panic_metric, 1);
                            error!(
                                scheduler = %log_name,
                                panic = %panic_message(payload.as_ref()),
                                "scheduled task panicked"
                            );
                        }
                    }

                    let current = schedule.get();
                    next_start = current.next_start(started, Instant::now());
                    trace!(
                        scheduler = %log_name,
                        kind = %current.kind,
                        period_ms = current.effective_period().as_millis(),
                        "next run scheduled"
                    );
                }

                debug!(scheduler = %log_name, "scheduler thread exiting");
            })
            .map_err(|source| SchedulerError::Spawn {
                name: name.clone(),
                thread: thread_name,
                source,
            })?;

        info!(scheduler = %name, initial_delay_ms = initial_delay.as_millis(), "scheduler started");

        Ok(Self {
            name,
            shared,
            worker: Mutex::new(Some((handle, done_rx))),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    /// Set the bound on how long [`shutdown`](Self::shutdown) waits.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Scheduler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.shared.stopped.lock()
    }

    /// Cancel future runs and release the thread.
    ///
    /// Idempotent and callable from any thread, including from inside the
    /// task. An in-flight run is not interrupted; this waits for it at most
    /// the shutdown timeout, then detaches the thread.
    pub fn shutdown(&self) {
        {
            let mut stopped = self.shared.stopped.lock();
            if *stopped {
                return;
            }
            *stopped = true;
        }
        self.shared.wakeup.notify_all();

        let Some((handle, done_rx)) = self.worker.lock().take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            debug!(scheduler = %self.name, "shutdown requested from the scheduler thread; not joining");
            return;
        }

        match done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    warn!(scheduler = %self.name, "scheduler thread panicked");
                }
                info!(scheduler = %self.name, "scheduler shut down");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    scheduler = %self.name,
                    timeout_ms = self.shutdown_timeout.as_millis(),
                    "scheduled task still running after shutdown timeout - detaching"
                );
            }
        }
    }
}

impl Drop for NamedScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
