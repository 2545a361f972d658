//! Error types for guard operations.

use thiserror::Error;

/// Errors surfaced to the caller constructing a guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The scheduler thread could not be started.
    #[error("failed to start scheduler `{name}`: {source}")]
    SchedulerStart {
        /// Scheduler name.
        name: String,
        /// Underlying spawn failure.
        #[source]
        source: std::io::Error,
    },
    /// Guard configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors produced by the named scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The dedicated scheduler thread could not be spawned.
    #[error("failed to spawn scheduler thread `{thread}`: {source}")]
    Spawn {
        /// Scheduler name.
        name: String,
        /// Thread name that was requested.
        thread: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl From<SchedulerError> for GuardError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Spawn { name, source, .. } => Self::SchedulerStart { name, source },
        }
    }
}

/// Failures recovered inside a single guard tick.
///
/// These never leave the scheduler thread; they are logged and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    /// The predicate panicked; the tick is treated as "predicate false".
    #[error("predicate panicked: {0}")]
    Predicate(String),
    /// The listener panicked; future ticks are unaffected.
    #[error("listener panicked: {0}")]
    Listener(String),
    /// Some threads could not be inspected and were left out of the snapshot.
    #[error("{skipped} thread(s) could not be inspected")]
    SnapshotPartial {
        /// Number of omitted threads.
        skipped: usize,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
