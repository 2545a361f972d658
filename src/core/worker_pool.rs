//! Profiled worker pool with dedicated OS threads.
//!
//! The pool is the kind of workload a [`PoolGuard`](crate::core::PoolGuard)
//! watches: it implements [`BacklogSource`](crate::core::BacklogSource) with
//! its queue depth, publishes queue/active/size gauges and await/run timers to
//! a [`Profiler`](crate::core::Profiler), and registers its workers with the
//! thread registry so their state and current task appear in snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_pool_guard::core::{WorkerPool, NoopProfiler};
//! use prometheus_pool_guard::config::WorkerPoolConfig;
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolConfig::new().with_name("inference").with_worker_count(4),
//!     my_executor,
//!     Arc::new(NoopProfiler),
//! )?;
//!
//! let handle = pool.submit(job)?;
//! let result = handle.wait(Duration::from_secs(60))?;
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

pub use native::WorkerPool;

/// Task identifier assigned by the pool.
pub type TaskId = u64;

/// Metadata handed to the executor with each payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMetadata {
    /// Pool-unique task identifier.
    pub id: TaskId,
    /// Submission time in milliseconds since the Unix epoch.
    pub submitted_at_ms: u128,
}

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug)]
pub enum PoolError {
    /// The task queue is full; no more tasks can be accepted.
    QueueFull,

    /// The operation timed out.
    Timeout,

    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (worker thread panic, channel closed, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "task queue is full"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of live worker threads.
    pub worker_count: usize,

    /// Currently executing tasks.
    pub active_tasks: u64,

    /// Tasks waiting in the queue.
    pub queued_tasks: u64,

    /// Total tasks completed successfully.
    pub completed_tasks: u64,

    /// Total tasks whose executor panicked.
    pub failed_tasks: u64,

    /// Total tasks accepted.
    pub submitted_tasks: u64,

    /// Total tasks rejected because the queue was full.
    pub rejected_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub queued_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
    pub rejected_tasks: AtomicU64,
    pub live_workers: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            worker_count: usize::try_from(self.live_workers.load(Ordering::Relaxed))
                .unwrap_or(usize::MAX),
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: self.queued_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            rejected_tasks: self.rejected_tasks.load(Ordering::Relaxed),
        }
    }
}

/// Pending result of a submitted task.
#[derive(Debug)]
pub struct TaskHandle<R> {
    id: TaskId,
    rx: Receiver<R>,
}

impl<R: Send + 'static> TaskHandle<R> {
    /// Task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Take the result if it is ready.
    #[must_use]
    pub fn try_take(&self) -> Option<R> {
        self.rx.try_recv().ok()
    }

    /// Block until the result is ready or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// - `PoolError::Timeout` if no result arrives in time
    /// - `PoolError::Internal` if the task was dropped (executor panic or shutdown)
    pub fn wait(&self, timeout: Duration) -> Result<R, PoolError> {
        self.rx.recv_timeout(timeout).map_err(|e| recv_error(self.id, e))
    }

    /// Wait for the result from an async context.
    ///
    /// The blocking wait runs on tokio's blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`wait`](Self::wait).
    pub async fn wait_async(self, timeout: Duration) -> Result<R, PoolError> {
        let Self { id, rx } = self;
        tokio::task::spawn_blocking(move || rx.recv_timeout(timeout))
            .await
            .map_err(|e| PoolError::Internal(e.to_string()))?
            .map_err(|e| recv_error(id, e))
    }
}

fn recv_error(id: TaskId, err: RecvTimeoutError) -> PoolError {
    match err {
        RecvTimeoutError::Timeout => PoolError::Timeout,
        RecvTimeoutError::Disconnected => PoolError::Internal(format!("task {id} was dropped")),
    }
}
