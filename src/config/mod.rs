//! Configuration models for the guard, its schedule, and the worker pool.

pub mod guard;
pub mod pool;

pub use guard::{GuardConfig, Schedule, ScheduleKind, DEFAULT_MAX_STACK_DEPTH, MIN_PERIOD};
pub use pool::WorkerPoolConfig;
