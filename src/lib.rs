//! # Prometheus Pool Guard
//!
//! A background watchdog for worker pools: it samples a pool's backlog on a
//! reloadable schedule and, when a caller-supplied predicate says the pool
//! looks stuck, captures a snapshot of the process's threads and hands it to
//! a listener.
//!
//! ## Core Problem Solved
//!
//! A pool that stops draining its queue is usually blocked on something:
//! a lock, a slow downstream call, a deadlock between workers. By the time
//! someone notices the backlog, the moment is gone. The guard captures the
//! thread states and stacks *while* the pool is saturated.
//!
//! ## Key Features
//!
//! - **Reloadable schedule**: the check interval lives in a
//!   [`DynamicProperty`](util::DynamicProperty) and is re-read after each tick
//! - **Predicate-gated capture**: snapshots are only taken when the predicate
//!   returns `true`; a panicking predicate is logged and counted
//! - **Thread snapshots**: every live thread with its state and frames,
//!   rendered as text blocks (`"name" STATE` then `    at ...` lines)
//! - **Bounded close**: idempotent, callable from the listener, never waits
//!   longer than the configured timeout for an in-flight tick
//! - **Profiled worker pool**: a dedicated-thread pool that reports its queue
//!   depth, timers, and worker stacks, ready to be guarded
//!
//! ## PoolGuard
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_pool_guard::config::Schedule;
//! use prometheus_pool_guard::core::{AggregatingProfiler, PoolGuard};
//! use prometheus_pool_guard::util::DynamicProperty;
//!
//! let (tx, rx) = crossbeam_channel::bounded::<u64>(1024);
//! let guard = PoolGuard::new(
//!     Arc::new(AggregatingProfiler::new()),
//!     DynamicProperty::of(Schedule::with_delay(Duration::from_secs(1))),
//!     rx.clone(),
//!     { let rx = rx.clone(); move || rx.len() > 100 },
//!     |backlog, dump| tracing::warn!(backlog, "pool saturated\n{dump}"),
//! )?;
//! # drop(tx);
//! guard.close();
//! # Ok::<(), prometheus_pool_guard::core::GuardError>(())
//! ```
//!
//! ## Thread introspection
//!
//! Rust has no portable way to read another thread's user-space stack. On
//! Linux the default introspector lists every thread from procfs with its
//! scheduler state and kernel wait site. Threads that register with the
//! [`ThreadRegistry`](infra::ThreadRegistry) and mark regions with
//! [`frame!`] additionally report logical frames; the worker pool and guard
//! schedulers do this for their own threads.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core guard abstractions: backlog, snapshots, scheduler, profiler, worker pool.
pub mod core;
/// Configuration models for guards, schedules, and worker pools.
pub mod config;
/// Builders to construct guards from code or configuration.
pub mod builders;
/// Thread introspection backends.
pub mod infra;
/// Tokio runtime adapters.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
