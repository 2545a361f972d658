//! Profiling sinks.
//!
//! The guard, its scheduler, and the worker pool report named timers,
//! counters, and gauges ("indicators") through the [`Profiler`] trait.
//! [`NoopProfiler`] discards everything; [`AggregatingProfiler`] keeps
//! in-memory aggregates for tests and local diagnostics.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

/// Gauge callback sampled when a report is taken.
pub type Indicator = Box<dyn Fn() -> i64 + Send + Sync>;

/// Metrics sink abstraction.
pub trait Profiler: Send + Sync {
    /// Record one completed call of `name` that took `latency`.
    fn record_call(&self, name: &str, latency: Duration);
    /// Add `delta` to counter `name`.
    fn increment(&self, name: &str, delta: u64);
    /// Register a gauge under `name`, replacing any previous one.
    fn attach_indicator(&self, name: &str, indicator: Indicator);
    /// Remove the gauge registered under `name`.
    fn detach_indicator(&self, name: &str);
}

/// RAII timer that records a call when stopped or dropped.
#[must_use = "a profiled call records its latency when dropped"]
pub struct ProfiledCall<'a> {
    profiler: &'a dyn Profiler,
    name: &'a str,
    started: Instant,
    stopped: bool,
}

impl<'a> ProfiledCall<'a> {
    /// Start timing `name`.
    pub fn start(profiler: &'a dyn Profiler, name: &'a str) -> Self {
        Self {
            profiler,
            name,
            started: Instant::now(),
            stopped: false,
        }
    }

    /// Stop the timer and record the call.
    pub fn stop(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.profiler.record_call(self.name, self.started.elapsed());
        }
    }
}

impl Drop for ProfiledCall<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Build a metric name of the form `<prefix>.<scope>.<metric>`.
///
/// Dots inside `scope` are replaced so the name keeps three segments.
#[must_use]
pub fn metric_name(prefix: &str, scope: &str, metric: &str) -> String {
    format!("{prefix}.{}.{metric}", scope.replace('.', "_"))
}

/// Profiler that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProfiler;

impl Profiler for NoopProfiler {
    fn record_call(&self, _name: &str, _latency: Duration) {}
    fn increment(&self, _name: &str, _delta: u64) {}
    fn attach_indicator(&self, _name: &str, _indicator: Indicator) {}
    fn detach_indicator(&self, _name: &str) {}
}

/// Aggregated timings for one call name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
    /// Completed calls.
    pub count: u64,
    /// Sum of latencies in microseconds.
    pub total_micros: u64,
    /// Largest latency in microseconds.
    pub max_micros: u64,
}

impl CallStats {
    fn record(&mut self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.count += 1;
        self.total_micros = self.total_micros.saturating_add(micros);
        self.max_micros = self.max_micros.max(micros);
    }
}

/// Point-in-time view of an [`AggregatingProfiler`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilerReport {
    /// Timers by name.
    pub calls: BTreeMap<String, CallStats>,
    /// Counters by name.
    pub counters: BTreeMap<String, u64>,
    /// Sampled gauges by name.
    pub indicators: BTreeMap<String, i64>,
}

impl ProfilerReport {
    /// Render the report as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which cannot happen for this shape in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// In-memory profiler for tests and dev.
#[derive(Default)]
pub struct AggregatingProfiler {
    calls: Mutex<HashMap<String, CallStats>>,
    counters: Mutex<HashMap<String, u64>>,
    indicators: RwLock<HashMap<String, Indicator>>,
}

impl AggregatingProfiler {
    /// Create an empty profiler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Timer statistics for `name`.
    #[must_use]
    pub fn call_stats(&self, name: &str) -> Option<CallStats> {
        self.calls.lock().get(name).copied()
    }

    /// Current value of counter `name` (0 if never incremented).
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    /// Sample gauge `name` if attached.
    #[must_use]
    pub fn indicator(&self, name: &str) -> Option<i64> {
        self.indicators.read().get(name).map(|indicator| indicator())
    }

    /// Take a report, sampling every attached gauge.
    #[must_use]
    pub fn report(&self) -> ProfilerReport {
        ProfilerReport {
            calls: self.calls.lock().iter().map(|(k, v)| (k.clone(), *v)).collect(),
            counters: self.counters.lock().iter().map(|(k, v)| (k.clone(), *v)).collect(),
            indicators: self
                .indicators
                .read()
                .iter()
                .map(|(k, indicator)| (k.clone(), indicator()))
                .collect(),
        }
    }
}

impl Profiler for AggregatingProfiler {
    fn record_call(&self, name: &str, latency: Duration) {
        self.calls.lock().entry(name.to_string()).or_default().record(latency);
    }

    fn increment(&self, name: &str, delta: u64) {
        let mut counters = self.counters.lock();
        let counter = counters.entry(name.to_string()).or_default();
        *counter = counter.saturating_add(delta);
    }

    fn attach_indicator(&self, name: &str, indicator: Indicator) {
        self.indicators.write().insert(name.to_string(), indicator);
    }

    fn detach_indicator(&self, name: &str) {
        self.indicators.write().remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_profiled_call_records_on_drop() {
        let profiler = AggregatingProfiler::new();
        {
            let _call = ProfiledCall::start(&profiler, "pool.x.run");
        }
        ProfiledCall::start(&profiler, "pool.x.run").stop();
        let stats = profiler.call_stats("pool.x.run").unwrap();
        assert_eq!(stats.count, 2);
    }

    #[test]
    fn test_indicator_sampled_on_report() {
        let profiler = AggregatingProfiler::new();
        let gauge = Arc::new(AtomicI64::new(3));
        let sampled = Arc::clone(&gauge);
        profiler.attach_indicator("pool.x.queue", Box::new(move || sampled.load(Ordering::Relaxed)));

        assert_eq!(profiler.indicator("pool.x.queue"), Some(3));
        gauge.store(7, Ordering::Relaxed);
        assert_eq!(profiler.report().indicators["pool.x.queue"], 7);

        profiler.detach_indicator("pool.x.queue");
        assert_eq!(profiler.indicator("pool.x.queue"), None);
    }

    #[test]
    fn test_metric_name_escapes_dots() {
        assert_eq!(metric_name("pool", "app.io", "queue"), "pool.app_io.queue");
    }

    #[test]
    fn test_report_json() {
        let profiler = AggregatingProfiler::new();
        profiler.increment("pool_guard.g.snapshot", 2);
        let json = profiler.report().to_json().unwrap();
        assert!(json.contains("\"pool_guard.g.snapshot\": 2"));
    }
}
