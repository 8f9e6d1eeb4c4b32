//! Scripted live-metrics and slow-query sources with call counters.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::collector::traits::{LiveMetricsSource, ProbeError, SlowQuerySource, StatusCounters};
use crate::slowlog::SlowQuerySample;

/// Per-probe call counters, shared by every clone of a [`MockLiveSource`].
#[derive(Debug, Default)]
pub struct LiveCallCounts {
    pub response_time: AtomicUsize,
    pub autoload: AtomicUsize,
    pub revisions: AtomicUsize,
    pub database_size: AtomicUsize,
    pub status_counters: AtomicUsize,
    pub table_overhead: AtomicUsize,
}

impl LiveCallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        [
            &self.response_time,
            &self.autoload,
            &self.revisions,
            &self.database_size,
            &self.status_counters,
            &self.table_overhead,
        ]
        .into_iter()
        .map(Self::get)
        .sum()
    }
}

/// Probe names accepted by [`MockLiveSource::failing`].
pub const PROBE_NAMES: [&str; 6] = [
    "response_time",
    "autoload",
    "revisions",
    "database_size",
    "status_counters",
    "table_overhead",
];

#[derive(Debug, Clone)]
pub struct MockLiveSource {
    pub response_ms: f64,
    pub autoload_bytes: u64,
    pub revisions: u64,
    pub database_size_bytes: u64,
    pub status: StatusCounters,
    pub table_overhead_bytes: u64,
    failing: HashSet<&'static str>,
    /// Artificial latency applied to every call.
    delay: Duration,
    counts: Arc<LiveCallCounts>,
}

impl Default for MockLiveSource {
    fn default() -> Self {
        Self {
            response_ms: 0.0,
            autoload_bytes: 0,
            revisions: 0,
            database_size_bytes: 0,
            status: StatusCounters::default(),
            table_overhead_bytes: 0,
            failing: HashSet::new(),
            delay: Duration::ZERO,
            counts: Arc::new(LiveCallCounts::default()),
        }
    }
}

impl MockLiveSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the named probe return [`ProbeError::Failed`].
    pub fn failing(mut self, probe: &'static str) -> Self {
        self.failing.insert(probe);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn counts(&self) -> Arc<LiveCallCounts> {
        Arc::clone(&self.counts)
    }

    fn call<T>(&self, probe: &'static str, counter: &AtomicUsize, value: T) -> Result<T, ProbeError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.failing.contains(probe) {
            return Err(ProbeError::Failed(format!("{probe} scripted failure")));
        }
        Ok(value)
    }
}

impl LiveMetricsSource for MockLiveSource {
    fn response_time_ms(&mut self) -> Result<f64, ProbeError> {
        self.call("response_time", &self.counts.response_time, self.response_ms)
    }

    fn autoload_bytes(&mut self) -> Result<u64, ProbeError> {
        self.call("autoload", &self.counts.autoload, self.autoload_bytes)
    }

    fn revision_count(&mut self) -> Result<u64, ProbeError> {
        self.call("revisions", &self.counts.revisions, self.revisions)
    }

    fn database_size_bytes(&mut self) -> Result<u64, ProbeError> {
        self.call("database_size", &self.counts.database_size, self.database_size_bytes)
    }

    fn status_counters(&mut self) -> Result<StatusCounters, ProbeError> {
        self.call("status_counters", &self.counts.status_counters, self.status)
    }

    fn table_overhead_bytes(&mut self) -> Result<u64, ProbeError> {
        self.call("table_overhead", &self.counts.table_overhead, self.table_overhead_bytes)
    }
}

/// Slow-query source returning a fixed list.
#[derive(Debug, Clone, Default)]
pub struct MockSlowQuerySource {
    pub samples: Vec<SlowQuerySample>,
    pub fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockSlowQuerySource {
    pub fn new(samples: Vec<SlowQuerySample>) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl SlowQuerySource for MockSlowQuerySource {
    fn slow_query_samples(&mut self) -> Result<Vec<SlowQuerySample>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProbeError::Unavailable("slow query log".to_string()));
        }
        Ok(self.samples.clone())
    }
}
