//! Thread introspection backends.
//!
//! - [`ThreadRegistry`]: portable; sees only threads that registered.
//! - [`ProcfsIntrospector`] (Linux): sees every thread of the process and
//!   overlays registry data for the ones that registered.

#[cfg(target_os = "linux")]
pub mod procfs;
pub mod registry;

use std::sync::Arc;

use crate::core::ThreadIntrospector;

#[cfg(target_os = "linux")]
pub use procfs::ProcfsIntrospector;
pub use registry::{
    enter_frame, enter_state, set_current_state, FrameGuard, StateGuard, ThreadRegistration,
    ThreadRegistry,
};

/// Push a logical stack frame for the calling thread, recording the call
/// site as its location. The frame is popped when the returned guard drops.
///
/// ```
/// let _frame = prometheus_pool_guard::frame!("load_model");
/// ```
#[macro_export]
macro_rules! frame {
    ($function:expr) => {
        $crate::infra::threads::enter_frame($function, concat!(file!(), ":", line!()))
    };
}

/// Best introspector for this platform.
///
/// On Linux with a mounted procfs this sees every thread of the process.
/// Elsewhere it falls back to the global [`ThreadRegistry`], which only sees
/// threads that registered (the worker pool and guard schedulers do).
#[must_use]
pub fn default_introspector() -> Arc<dyn ThreadIntrospector> {
    #[cfg(target_os = "linux")]
    {
        if ProcfsIntrospector::is_available() {
            return Arc::new(ProcfsIntrospector::new());
        }
    }
    Arc::clone(ThreadRegistry::global()) as Arc<dyn ThreadIntrospector>
}
