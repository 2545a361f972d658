//! In-process thread registry.
//!
//! Rust cannot walk another thread's user-space stack, so threads that want
//! to show up in snapshots with meaningful state opt in: they register
//! themselves, then publish their scheduling state and a logical frame stack
//! through RAII guards. The registry is the portable [`ThreadIntrospector`];
//! on Linux it also enriches the procfs view of every OS thread.
//!
//! ```
//! use std::sync::Arc;
//! use prometheus_pool_guard::core::{ThreadIntrospector, ThreadSnapshot};
//! use prometheus_pool_guard::infra::threads::ThreadRegistry;
//!
//! let registry = Arc::new(ThreadRegistry::new());
//! let _registration = registry.register_current_as("ingest-0");
//! let _frame = prometheus_pool_guard::frame!("ingest_batch");
//!
//! let snapshot = ThreadSnapshot::capture(registry.as_ref(), 16);
//! assert!(snapshot.render().starts_with("\"ingest-0\" RUNNABLE\n    at ingest_batch @ "));
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::core::{StackFrame, ThreadHandle, ThreadInfo, ThreadIntrospector, ThreadState};

struct ThreadSlot {
    name: String,
    os_tid: Option<u64>,
    state: AtomicU8,
    /// Outermost first.
    frames: Mutex<Vec<StackFrame>>,
}

impl ThreadSlot {
    fn info(&self, max_depth: usize) -> ThreadInfo {
        let frames = self.frames.lock();
        ThreadInfo {
            name: self.name.clone(),
            state: ThreadState::from_u8(self.state.load(Ordering::Acquire)),
            frames: frames.iter().rev().take(max_depth).cloned().collect(),
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Arc<ThreadSlot>>> = const { RefCell::new(None) };
}

static GLOBAL: OnceLock<Arc<ThreadRegistry>> = OnceLock::new();

/// Registry of threads that opted in to snapshot reporting.
///
/// Enumeration follows registration order.
pub struct ThreadRegistry {
    next_id: AtomicU64,
    threads: RwLock<BTreeMap<u64, Arc<ThreadSlot>>>,
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            threads: RwLock::new(BTreeMap::new()),
        }
    }

    /// Process-wide registry used by the worker pool and guard scheduler.
    pub fn global() -> &'static Arc<Self> {
        GLOBAL.get_or_init(|| Arc::new(Self::new()))
    }

    /// Register the calling thread under its `std::thread` name.
    ///
    /// Unnamed threads are registered as `thread-<n>`.
    #[must_use = "the thread is unregistered when the registration is dropped"]
    pub fn register_current(self: &Arc<Self>) -> ThreadRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let current = std::thread::current();
        let name = current
            .name()
            .map_or_else(|| format!("thread-{id}"), str::to_owned);
        self.register_with_id(id, name)
    }

    /// Register the calling thread under `name`.
    ///
    /// A thread registers with at most one registry at a time; a second
    /// registration replaces the first as the target of [`enter_frame`] and
    /// [`set_current_state`].
    #[must_use = "the thread is unregistered when the registration is dropped"]
    pub fn register_current_as(self: &Arc<Self>, name: impl Into<String>) -> ThreadRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.register_with_id(id, name.into())
    }

    fn register_with_id(self: &Arc<Self>, id: u64, name: String) -> ThreadRegistration {
        let slot = Arc::new(ThreadSlot {
            name,
            os_tid: current_os_tid(),
            state: AtomicU8::new(ThreadState::Runnable.to_u8()),
            frames: Mutex::new(Vec::new()),
        });
        self.threads.write().insert(id, Arc::clone(&slot));
        let previous = CURRENT.with(|current| current.replace(Some(Arc::clone(&slot))));

        ThreadRegistration {
            registry: Arc::clone(self),
            id,
            slot,
            previous,
            _not_send: PhantomData,
        }
    }

    /// Number of registered threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.read().len()
    }

    /// Whether no thread is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.read().is_empty()
    }

    /// Inspect the registered thread with OS thread id `tid`, if any.
    #[must_use]
    pub fn inspect_os_tid(&self, tid: u64, max_depth: usize) -> Option<ThreadInfo> {
        let threads = self.threads.read();
        threads
            .values()
            .find(|slot| slot.os_tid == Some(tid))
            .map(|slot| slot.info(max_depth))
    }
}

impl ThreadIntrospector for ThreadRegistry {
    fn list_live_threads(&self) -> Vec<ThreadHandle> {
        self.threads.read().keys().copied().map(ThreadHandle).collect()
    }

    fn inspect(&self, handle: ThreadHandle, max_depth: usize) -> Option<ThreadInfo> {
        let slot = self.threads.read().get(&handle.0).cloned()?;
        Some(slot.info(max_depth))
    }
}

/// Keeps the calling thread registered; unregisters it when dropped.
///
/// Not `Send`: a registration belongs to the thread that created it.
pub struct ThreadRegistration {
    registry: Arc<ThreadRegistry>,
    id: u64,
    slot: Arc<ThreadSlot>,
    previous: Option<Arc<ThreadSlot>>,
    _not_send: PhantomData<*const ()>,
}

impl ThreadRegistration {
    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// Handle of this thread within its registry.
    #[must_use]
    pub const fn handle(&self) -> ThreadHandle {
        ThreadHandle(self.id)
    }
}

impl Drop for ThreadRegistration {
    fn drop(&mut self) {
        self.slot
            .state
            .store(ThreadState::Terminated.to_u8(), Ordering::Release);
        self.registry.threads.write().remove(&self.id);
        let previous = self.previous.take();
        let _ = CURRENT.try_with(|current| {
            let mut current = current.borrow_mut();
            if current.as_ref().is_some_and(|slot| Arc::ptr_eq(slot, &self.slot)) {
                *current = previous;
            }
        });
    }
}

/// Set the scheduling state published by the calling thread.
///
/// No-op if the thread is not registered.
pub fn set_current_state(state: ThreadState) {
    let _ = CURRENT.try_with(|current| {
        if let Some(slot) = current.borrow().as_ref() {
            slot.state.store(state.to_u8(), Ordering::Release);
        }
    });
}

/// Publish `state` until the returned guard is dropped, then restore the
/// previous state.
#[must_use = "the previous state is restored when the guard is dropped"]
pub fn enter_state(state: ThreadState) -> StateGuard {
    let slot = current_slot();
    let previous = slot
        .as_ref()
        .map(|slot| slot.state.swap(state.to_u8(), Ordering::AcqRel));
    StateGuard {
        slot,
        previous,
        _not_send: PhantomData,
    }
}

/// Restores the previous published state on drop. Built by [`enter_state`].
pub struct StateGuard {
    slot: Option<Arc<ThreadSlot>>,
    previous: Option<u8>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        if let (Some(slot), Some(previous)) = (&self.slot, self.previous) {
            slot.state.store(previous, Ordering::Release);
        }
    }
}

/// Push a logical frame for the calling thread until the guard is dropped.
///
/// Prefer the [`frame!`](crate::frame) macro, which fills in the source
/// location. No-op if the thread is not registered.
#[must_use = "the frame is popped when the guard is dropped"]
pub fn enter_frame(function: impl Into<String>, location: impl Into<String>) -> FrameGuard {
    let slot = current_slot();
    let depth = slot.as_ref().map(|slot| {
        let mut frames = slot.frames.lock();
        let depth = frames.len();
        frames.push(StackFrame::new(function, location));
        depth
    });
    FrameGuard {
        slot,
        depth,
        _not_send: PhantomData,
    }
}

/// Pops its frame (and anything pushed above it) on drop. Built by [`enter_frame`].
pub struct FrameGuard {
    slot: Option<Arc<ThreadSlot>>,
    depth: Option<usize>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if let (Some(slot), Some(depth)) = (&self.slot, self.depth) {
            slot.frames.lock().truncate(depth);
        }
    }
}

fn current_slot() -> Option<Arc<ThreadSlot>> {
    CURRENT
        .try_with(|current| current.borrow().clone())
        .ok()
        .flatten()
}

#[cfg(target_os = "linux")]
fn current_os_tid() -> Option<u64> {
    let link = std::fs::read_link("/proc/thread-self").ok()?;
    link.file_name()?.to_str()?.parse().ok()
}

#[cfg(not(target_os = "linux"))]
const fn current_os_tid() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let registry = Arc::new(ThreadRegistry::new());
        {
            let registration = registry.register_current_as("sampler");
            assert_eq!(registration.name(), "sampler");
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
        assert!(registry.list_live_threads().is_empty());
    }

    #[test]
    fn test_unnamed_threads_get_distinct_names() {
        let registry = Arc::new(ThreadRegistry::new());
        let start = Arc::new(std::sync::Barrier::new(16));
        let (names_tx, names_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let start = Arc::clone(&start);
                let names_tx = names_tx.clone();
                let release_rx = release_rx.clone();
                std::thread::spawn(move || {
                    start.wait();
                    let registration = registry.register_current();
                    names_tx.send(registration.name().to_string()).unwrap();
                    let _ = release_rx.recv();
                })
            })
            .collect();
        drop(names_tx);

        let mut names: Vec<String> = (0..16).map(|_| names_rx.recv().unwrap()).collect();
        assert_eq!(registry.len(), 16);
        assert!(names.iter().all(|name| name.starts_with("thread-")));
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 16);

        drop(release_tx);
        for thread in threads {
            thread.join().unwrap();
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_frames_innermost_first() {
        let registry = Arc::new(ThreadRegistry::new());
        let registration = registry.register_current_as("sampler");
        let _outer = enter_frame("outer", "a.rs:1");
        {
            let _inner = enter_frame("inner", "a.rs:2");
            let info = registry.inspect(registration.handle(), 10).unwrap();
            let names: Vec<_> = info.frames.iter().map(|f| f.function.as_str()).collect();
            assert_eq!(names, ["inner", "outer"]);
        }
        let info = registry.inspect(registration.handle(), 10).unwrap();
        assert_eq!(info.frames.len(), 1);
    }

    #[test]
    fn test_state_guard_restores() {
        let registry = Arc::new(ThreadRegistry::new());
        let registration = registry.register_current_as("sampler");
        {
            let _waiting = enter_state(ThreadState::TimedWaiting);
            let info = registry.inspect(registration.handle(), 1).unwrap();
            assert_eq!(info.state, ThreadState::TimedWaiting);
        }
        let info = registry.inspect(registration.handle(), 1).unwrap();
        assert_eq!(info.state, ThreadState::Runnable);
        set_current_state(ThreadState::Blocked);
        let info = registry.inspect(registration.handle(), 1).unwrap();
        assert_eq!(info.state, ThreadState::Blocked);
    }

    #[test]
    fn test_unregistered_thread_is_noop() {
        let _frame = enter_frame("nothing", "a.rs:1");
        let _state = enter_state(ThreadState::Waiting);
        set_current_state(ThreadState::Blocked);
    }

    #[test]
    fn test_max_depth_keeps_innermost() {
        let registry = Arc::new(ThreadRegistry::new());
        let registration = registry.register_current_as("deep");
        let _guards: Vec<_> = (0..5)
            .map(|i| enter_frame(format!("level{i}"), "a.rs:1"))
            .collect();
        let info = registry.inspect(registration.handle(), 2).unwrap();
        let names: Vec<_> = info.frames.iter().map(|f| f.function.as_str()).collect();
        assert_eq!(names, ["level4", "level3"]);
    }
}
