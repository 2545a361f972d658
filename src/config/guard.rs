//! Guard and schedule configuration.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Default per-thread stack frame cap for snapshots.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1000;

/// Floor applied to every schedule period so a zero period cannot busy-loop.
pub const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Ceiling for deadlines that would not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `base + delay`, saturating at [`FAR_FUTURE`] from `base`.
pub(crate) fn deadline_after(base: Instant, delay: Duration) -> Instant {
    base.checked_add(delay)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}

/// How the next run is placed relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Next run starts `period` after the previous run finished.
    FixedDelay,
    /// Next run starts `period` after the previous run started, or right away
    /// if the previous run overran. Runs never overlap.
    FixedRate,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedDelay => f.write_str("fixed_delay"),
            Self::FixedRate => f.write_str("fixed_rate"),
        }
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed_delay" | "delay" => Ok(Self::FixedDelay),
            "fixed_rate" | "rate" => Ok(Self::FixedRate),
            other => Err(format!("unknown schedule kind `{other}`")),
        }
    }
}

/// How often a scheduled task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schedule {
    /// Placement policy.
    pub kind: ScheduleKind,
    /// Period in milliseconds.
    pub period_ms: u64,
}

impl Schedule {
    /// Fixed-delay schedule.
    #[must_use]
    pub fn with_delay(period: Duration) -> Self {
        Self {
            kind: ScheduleKind::FixedDelay,
            period_ms: duration_ms(period),
        }
    }

    /// Fixed-rate schedule.
    #[must_use]
    pub fn with_rate(period: Duration) -> Self {
        Self {
            kind: ScheduleKind::FixedRate,
            period_ms: duration_ms(period),
        }
    }

    /// The configured period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// The period actually used for scheduling, clamped to [`MIN_PERIOD`].
    #[must_use]
    pub fn effective_period(&self) -> Duration {
        self.period().max(MIN_PERIOD)
    }

    /// Start instant of the run following one that ran from `started` to `finished`.
    #[must_use]
    pub fn next_start(&self, started: Instant, finished: Instant) -> Instant {
        let period = self.effective_period();
        match self.kind {
            ScheduleKind::FixedDelay => deadline_after(finished, period),
            ScheduleKind::FixedRate => deadline_after(started, period).max(finished),
        }
    }

    /// Validate schedule values.
    pub fn validate(&self) -> Result<(), String> {
        if self.period_ms == 0 {
            return Err("schedule period_ms must be greater than 0".into());
        }
        Ok(())
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::with_delay(Duration::from_secs(1))
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Pool guard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Guard name; names the scheduler thread and metrics.
    pub name: String,
    /// Check schedule.
    pub schedule: Schedule,
    /// Maximum stack frames captured per thread.
    pub max_stack_depth: usize,
    /// Delay before the first check, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on how long `close()` waits for an in-flight check.
    pub shutdown_timeout_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            name: "thread-pool-guard".into(),
            schedule: Schedule::default(),
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            initial_delay_ms: 0,
            shutdown_timeout_ms: 2_000,
        }
    }
}

impl GuardConfig {
    /// Validate guard configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        self.schedule.validate()?;
        if self.max_stack_depth == 0 {
            return Err("max_stack_depth must be greater than 0".into());
        }
        if self.shutdown_timeout_ms == 0 {
            return Err("shutdown_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse guard configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `POOL_GUARD_*` environment variables, after
    /// loading a `.env` file if one is present. Unset variables keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable cannot be parsed or the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Ok(name) = std::env::var("POOL_GUARD_NAME") {
            cfg.name = name;
        }
        if let Some(kind) = env_parse("POOL_GUARD_SCHEDULE_KIND", str::parse::<ScheduleKind>)? {
            cfg.schedule.kind = kind;
        }
        if let Some(ms) = env_parse("POOL_GUARD_CHECK_INTERVAL_MS", str::parse::<u64>)? {
            cfg.schedule.period_ms = ms;
        }
        if let Some(depth) = env_parse("POOL_GUARD_MAX_STACK_DEPTH", str::parse::<usize>)? {
            cfg.max_stack_depth = depth;
        }
        if let Some(ms) = env_parse("POOL_GUARD_SHUTDOWN_TIMEOUT_MS", str::parse::<u64>)? {
            cfg.shutdown_timeout_ms = ms;
        }

        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }

    /// Delay before the first check.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Bound on shutdown waiting.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn env_parse<T, E>(key: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> AppResult<Option<T>>
where
    E: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse(raw.trim())
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        Err(_) => Ok(None),
    }
}
