//! Backlog of a tokio runtime's shared injection queue.

use std::sync::Arc;

use crate::core::BacklogSource;

/// Reports the number of tasks waiting in a tokio runtime's global queue.
///
/// Tasks spawned from outside the runtime land in this queue; a multi-thread
/// runtime whose workers are all blocked lets it grow without bound, which
/// makes it a useful signal for a [`PoolGuard`](crate::core::PoolGuard).
#[derive(Clone, Debug)]
pub struct TokioRuntimeBacklog {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioRuntimeBacklog {
    /// Observe the runtime behind `handle`.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Observe the runtime the caller is running on, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }

    /// Number of worker threads of the observed runtime.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.handle.metrics().num_workers()
    }
}

impl BacklogSource for TokioRuntimeBacklog {
    fn backlog(&self) -> usize {
        self.handle.metrics().global_queue_depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_outside_runtime() {
        assert!(TokioRuntimeBacklog::current().is_none());
    }

    #[test]
    fn test_idle_runtime_has_empty_queue() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap();
        let backlog = TokioRuntimeBacklog::new(rt.handle().clone());
        assert_eq!(backlog.num_workers(), 2);
        assert_eq!(backlog.backlog(), 0);
    }

    #[tokio::test]
    async fn test_current_inside_runtime() {
        let backlog = TokioRuntimeBacklog::current().unwrap();
        assert_eq!(backlog.num_workers(), 1);
    }
}
