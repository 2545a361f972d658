//! Builder for [`PoolGuard`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::{GuardConfig, Schedule};
use crate::core::guard::GuardSettings;
use crate::core::{BacklogSource, GuardError, PoolGuard, Profiler, ThreadIntrospector};
use crate::infra::threads::default_introspector;
use crate::util::DynamicProperty;

/// Collects optional guard settings, then starts the guard.
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use prometheus_pool_guard::config::GuardConfig;
/// use prometheus_pool_guard::core::{backlog_fn, NoopProfiler, PoolGuard};
/// use prometheus_pool_guard::builders::PoolGuardBuilder;
///
/// let cfg = GuardConfig::from_json_str(r#"{
///     "name": "ingest-guard",
///     "schedule": { "kind": "fixed_delay", "period_ms": 500 },
///     "max_stack_depth": 64
/// }"#).unwrap();
///
/// let builder = PoolGuardBuilder::from_config(Arc::new(NoopProfiler), &cfg)?;
/// let schedule = builder.schedule();
/// let guard = builder.build(backlog_fn(|| 0), || false, |_, _| {})?;
/// assert_eq!(guard.name(), "ingest-guard");
/// assert_eq!(schedule.get().period(), Duration::from_millis(500));
/// # Ok::<(), prometheus_pool_guard::core::GuardError>(())
/// ```
pub struct PoolGuardBuilder {
    profiler: Arc<dyn Profiler>,
    schedule: DynamicProperty<Schedule>,
    name: String,
    max_stack_depth: usize,
    initial_delay: Duration,
    shutdown_timeout: Duration,
    introspector: Option<Arc<dyn ThreadIntrospector>>,
}

impl PoolGuardBuilder {
    /// Builder with [`GuardConfig::default`] settings.
    #[must_use]
    pub fn new(profiler: Arc<dyn Profiler>, schedule: DynamicProperty<Schedule>) -> Self {
        let defaults = GuardConfig::default();
        Self {
            profiler,
            schedule,
            name: defaults.name.clone(),
            max_stack_depth: defaults.max_stack_depth,
            initial_delay: defaults.initial_delay(),
            shutdown_timeout: defaults.shutdown_timeout(),
            introspector: None,
        }
    }

    /// Builder seeded from validated configuration. The schedule starts at
    /// `cfg.schedule`; reload it through [`schedule`](Self::schedule).
    ///
    /// # Errors
    ///
    /// Returns `GuardError::InvalidConfig` if `cfg` does not validate.
    pub fn from_config(profiler: Arc<dyn Profiler>, cfg: &GuardConfig) -> Result<Self, GuardError> {
        cfg.validate().map_err(GuardError::InvalidConfig)?;
        Ok(Self {
            profiler,
            schedule: DynamicProperty::of(cfg.schedule),
            name: cfg.name.clone(),
            max_stack_depth: cfg.max_stack_depth,
            initial_delay: cfg.initial_delay(),
            shutdown_timeout: cfg.shutdown_timeout(),
            introspector: None,
        })
    }

    /// Handle to the schedule the guard will poll.
    #[must_use]
    pub fn schedule(&self) -> DynamicProperty<Schedule> {
        self.schedule.clone()
    }

    /// Guard name; the scheduler thread is named `<name>-0`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Per-thread frame cap for snapshots.
    #[must_use]
    pub const fn max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    /// Delay before the first tick.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Bound on how long `close()` waits for an in-flight tick.
    #[must_use]
    pub const fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Thread introspector used for snapshots. Defaults to
    /// [`default_introspector`].
    #[must_use]
    pub fn introspector(mut self, introspector: Arc<dyn ThreadIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Start the guard.
    ///
    /// # Errors
    ///
    /// - `GuardError::InvalidConfig` for an empty name or a zero frame cap
    /// - `GuardError::SchedulerStart` if the scheduler thread cannot start
    pub fn build<B, P, L>(self, pool: B, predicate: P, listener: L) -> Result<PoolGuard, GuardError>
    where
        B: BacklogSource + 'static,
        P: Fn() -> bool + Send + 'static,
        L: Fn(usize, &str) + Send + 'static,
    {
        if self.name.trim().is_empty() {
            return Err(GuardError::InvalidConfig("name must not be empty".into()));
        }
        if self.max_stack_depth == 0 {
            return Err(GuardError::InvalidConfig(
                "max_stack_depth must be greater than 0".into(),
            ));
        }

        let settings = GuardSettings {
            name: self.name,
            profiler: self.profiler,
            schedule: self.schedule,
            max_stack_depth: self.max_stack_depth,
            initial_delay: self.initial_delay,
            shutdown_timeout: self.shutdown_timeout,
            introspector: self.introspector.unwrap_or_else(default_introspector),
        };
        PoolGuard::start(settings, pool, predicate, listener)
    }
}
