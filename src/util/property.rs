//! Runtime-reloadable configuration values.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// A shared, thread-safe cell holding a value that may be replaced at runtime.
///
/// Clones share the same cell: a `set` through one handle is visible to every
/// other handle on its next `get`. Readers poll; there is no change
/// notification.
///
/// ```
/// use std::time::Duration;
/// use prometheus_pool_guard::config::Schedule;
/// use prometheus_pool_guard::util::DynamicProperty;
///
/// let rate = DynamicProperty::of(Schedule::with_delay(Duration::from_secs(1)));
/// let reader = rate.clone();
/// rate.set(Schedule::with_delay(Duration::from_millis(250)));
/// assert_eq!(reader.get().period(), Duration::from_millis(250));
/// ```
pub struct DynamicProperty<T> {
    value: Arc<RwLock<T>>,
}

impl<T> DynamicProperty<T> {
    /// Create a property with an initial value.
    pub fn of(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Replace the current value, returning the previous one.
    pub fn set(&self, value: T) -> T {
        std::mem::replace(&mut *self.value.write(), value)
    }

    /// Apply `f` to the current value under a read lock.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }
}

impl<T: Clone> DynamicProperty<T> {
    /// Read a copy of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T> Clone for DynamicProperty<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> From<T> for DynamicProperty<T> {
    fn from(value: T) -> Self {
        Self::of(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DynamicProperty").field(&*self.value.read()).finish()
    }
}
