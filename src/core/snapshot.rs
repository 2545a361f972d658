//! Thread snapshots: capture and text rendering.
//!
//! A [`ThreadSnapshot`] is taken through a [`ThreadIntrospector`], which knows
//! how to enumerate threads and inspect one of them. Enumeration and
//! inspection race with threads exiting; a thread that disappears in between
//! is counted in [`ThreadSnapshot::skipped`] and left out.
//!
//! The rendered form lists one block per thread, in enumeration order:
//!
//! ```text
//! "pl-worker-0" WAITING
//!     at WorkerPool::recv @ src/core/worker_pool/native.rs:212
//!
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::util::clock::now_ms;
use crate::util::panic_message;

/// Scheduling state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadState {
    /// Created but not started.
    New,
    /// Running or ready to run.
    Runnable,
    /// Blocked on a lock or uninterruptible I/O.
    Blocked,
    /// Parked until woken by another thread.
    Waiting,
    /// Parked with a deadline.
    TimedWaiting,
    /// Finished.
    Terminated,
}

impl ThreadState {
    /// Upper-case label used in rendered snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Runnable => "RUNNABLE",
            Self::Blocked => "BLOCKED",
            Self::Waiting => "WAITING",
            Self::TimedWaiting => "TIMED_WAITING",
            Self::Terminated => "TERMINATED",
        }
    }

    /// Map a Linux `/proc/<pid>/task/<tid>/stat` state code.
    #[must_use]
    pub const fn from_proc_code(code: char) -> Option<Self> {
        match code {
            'R' => Some(Self::Runnable),
            'D' => Some(Self::Blocked),
            'S' | 'I' | 'T' | 't' | 'W' | 'P' | 'K' => Some(Self::Waiting),
            'Z' | 'X' | 'x' => Some(Self::Terminated),
            _ => None,
        }
    }

    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Runnable => 1,
            Self::Blocked => 2,
            Self::Waiting => 3,
            Self::TimedWaiting => 4,
            Self::Terminated => 5,
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::New,
            1 => Self::Runnable,
            2 => Self::Blocked,
            3 => Self::Waiting,
            4 => Self::TimedWaiting,
            _ => Self::Terminated,
        }
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stack frame, rendered as `function @ location`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StackFrame {
    /// Function or activity label.
    pub function: String,
    /// Source location (`file:line`) or origin such as `kernel`.
    pub location: String,
}

impl StackFrame {
    /// Create a frame.
    pub fn new(function: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            location: location.into(),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.function, self.location)
    }
}

/// Inspected state of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadInfo {
    /// Thread name.
    pub name: String,
    /// Scheduling state.
    pub state: ThreadState,
    /// Frames, innermost first.
    pub frames: Vec<StackFrame>,
}

/// Opaque identifier handed out by a [`ThreadIntrospector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadHandle(pub u64);

/// Capability to enumerate and inspect live threads.
pub trait ThreadIntrospector: Send + Sync {
    /// Identifiers of the threads alive right now.
    fn list_live_threads(&self) -> Vec<ThreadHandle>;

    /// Inspect one thread, returning at most `max_depth` frames.
    ///
    /// Returns `None` if the thread exited since enumeration or cannot be read.
    fn inspect(&self, handle: ThreadHandle, max_depth: usize) -> Option<ThreadInfo>;
}

impl<T: ThreadIntrospector + ?Sized> ThreadIntrospector for std::sync::Arc<T> {
    fn list_live_threads(&self) -> Vec<ThreadHandle> {
        (**self).list_live_threads()
    }

    fn inspect(&self, handle: ThreadHandle, max_depth: usize) -> Option<ThreadInfo> {
        (**self).inspect(handle, max_depth)
    }
}

/// Immutable point-in-time capture of thread states and stacks.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSnapshot {
    id: Uuid,
    captured_at_ms: u128,
    threads: Vec<ThreadInfo>,
    skipped: usize,
}

impl ThreadSnapshot {
    /// Capture every thread `introspector` can see, keeping at most
    /// `max_depth` frames per thread.
    ///
    /// A thread whose inspection fails or panics is counted in
    /// [`skipped`](Self::skipped) and the rest are still captured.
    #[must_use]
    pub fn capture(introspector: &dyn ThreadIntrospector, max_depth: usize) -> Self {
        let handles = introspector.list_live_threads();
        let mut threads = Vec::with_capacity(handles.len());
        let mut skipped = 0;

        for handle in handles {
            let inspected =
                panic::catch_unwind(AssertUnwindSafe(|| introspector.inspect(handle, max_depth)));
            match inspected {
                Ok(Some(mut info)) => {
                    info.frames.truncate(max_depth);
                    threads.push(info);
                }
                Ok(None) => skipped += 1,
                Err(payload) => {
                    debug!(
                        thread = handle.0,
                        panic = %panic_message(payload.as_ref()),
                        "thread inspection panicked; leaving it out"
                    );
                    skipped += 1;
                }
            }
        }

        Self {
            id: Uuid::new_v4(),
            captured_at_ms: now_ms(),
            threads,
            skipped,
        }
    }

    /// Unique snapshot identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Capture time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn captured_at_ms(&self) -> u128 {
        self.captured_at_ms
    }

    /// Captured threads in enumeration order.
    #[must_use]
    pub fn threads(&self) -> &[ThreadInfo] {
        &self.threads
    }

    /// Number of captured threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Whether no thread was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Threads that were enumerated but could not be inspected.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Render the snapshot as text.
    #[must_use]
    pub fn render(&self) -> String {
        let frames: usize = self.threads.iter().map(|t| t.frames.len()).sum();
        let mut out = String::with_capacity(self.threads.len() * 48 + frames * 64);
        for thread in &self.threads {
            let _ = write_thread(&mut out, thread);
        }
        out
    }
}

impl fmt::Display for ThreadSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for thread in &self.threads {
            write_thread(f, thread)?;
        }
        Ok(())
    }
}

fn write_thread(out: &mut impl fmt::Write, thread: &ThreadInfo) -> fmt::Result {
    writeln!(out, "\"{}\" {}", thread.name, thread.state)?;
    for frame in &thread.frames {
        writeln!(out, "    at {frame}")?;
    }
    out.write_char('\n')
}
