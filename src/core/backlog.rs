//! Backlog sampling for observed pools.

use std::fmt;
use std::sync::Arc;

/// Read-only view of a pool's queued-but-not-started work.
///
/// Implementations must not block on pool internals; the guard calls this
/// on its scheduler thread every tick.
pub trait BacklogSource: Send + Sync {
    /// Number of queued work items right now.
    fn backlog(&self) -> usize;
}

impl<T: BacklogSource + ?Sized> BacklogSource for Arc<T> {
    fn backlog(&self) -> usize {
        (**self).backlog()
    }
}

impl<T: Send> BacklogSource for crossbeam_channel::Receiver<T> {
    fn backlog(&self) -> usize {
        self.len()
    }
}

impl<T: Send> BacklogSource for crossbeam_channel::Sender<T> {
    fn backlog(&self) -> usize {
        self.len()
    }
}

/// Backlog source backed by a closure. Built with [`backlog_fn`].
pub struct FnBacklog<F>(F);

impl<F> BacklogSource for FnBacklog<F>
where
    F: Fn() -> usize + Send + Sync,
{
    fn backlog(&self) -> usize {
        (self.0)()
    }
}

impl<F> fmt::Debug for FnBacklog<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnBacklog")
    }
}

/// Wrap a closure as a [`BacklogSource`].
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use prometheus_pool_guard::core::{backlog_fn, BacklogSource};
///
/// let depth = Arc::new(AtomicUsize::new(4));
/// let source = backlog_fn({
///     let depth = Arc::clone(&depth);
///     move || depth.load(Ordering::Relaxed)
/// });
/// assert_eq!(source.backlog(), 4);
/// ```
pub const fn backlog_fn<F>(f: F) -> FnBacklog<F>
where
    F: Fn() -> usize + Send + Sync,
{
    FnBacklog(f)
}
