//! Task execution trait for the worker pool.

use async_trait::async_trait;

use super::TaskMetadata;

/// Executes worker pool payloads.
///
/// Results need not be serializable: channels, handles, and other
/// non-`Serialize` types are fine.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_pool_guard::core::{TaskMetadata, WorkerExecutor};
///
/// #[derive(Clone)]
/// struct Resize;
///
/// #[async_trait]
/// impl WorkerExecutor<Vec<u8>, usize> for Resize {
///     async fn execute(&self, image: Vec<u8>, _meta: TaskMetadata) -> usize {
///         image.len() / 2
///     }
/// }
/// ```
#[async_trait]
pub trait WorkerExecutor<P, R>: Send + Sync + Clone + 'static
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Execute a task payload and return the result.
    ///
    /// Called on a dedicated worker thread that drives its own
    /// single-threaded tokio runtime, so CPU-bound work here does not block
    /// the caller's runtime. While this runs, the worker reports
    /// `RUNNABLE` in thread snapshots.
    async fn execute(&self, payload: P, meta: TaskMetadata) -> R;
}
