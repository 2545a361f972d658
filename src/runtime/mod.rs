//! Tokio runtime adapters.

pub mod tokio_backlog;

pub use tokio_backlog::TokioRuntimeBacklog;
