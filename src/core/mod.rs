//! Core guard abstractions: backlog sampling, thread snapshots, scheduling,
//! profiling, and the profiled worker pool.

pub mod backlog;
pub mod error;
#[cfg(feature = "tokio-runtime")]
pub mod executor;
pub mod guard;
pub mod profiler;
pub mod scheduler;
pub mod snapshot;
#[cfg(feature = "tokio-runtime")]
pub mod worker_pool;

pub use backlog::{backlog_fn, BacklogSource, FnBacklog};
pub use error::{AppResult, GuardError, SchedulerError, TickError};
#[cfg(feature = "tokio-runtime")]
pub use executor::WorkerExecutor;
pub use guard::{GuardState, PoolGuard};
pub use profiler::{
    metric_name, AggregatingProfiler, CallStats, Indicator, NoopProfiler, ProfiledCall, Profiler,
    ProfilerReport,
};
pub use scheduler::{NamedScheduler, DEFAULT_SHUTDOWN_TIMEOUT};
pub use snapshot::{
    StackFrame, ThreadHandle, ThreadInfo, ThreadIntrospector, ThreadSnapshot, ThreadState,
};
#[cfg(feature = "tokio-runtime")]
pub use worker_pool::{PoolError, PoolStats, TaskHandle, TaskId, TaskMetadata, WorkerPool};
