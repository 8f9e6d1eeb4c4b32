//! Live data-store metrics sampler.
//!
//! Polls a [`LiveMetricsSource`] (and optionally a [`SlowQuerySource`]) and
//! keeps the result in a single TTL cache slot so that any number of pollers
//! trigger at most one probe batch per TTL window.
//!
//! # States
//!
//! ```text
//!            enabled=false
//!   ┌──────────┐ ◄──────── any
//!   │ Disabled │
//!   └──────────┘
//!   ┌──────┐ current()/refresh() ┌──────────┐  success  ┌────────────┐
//!   │ Idle │ ──────────────────► │ Sampling │ ────────► │ CacheFresh │
//!   └──────┘                     └──────────┘           └─────┬──────┘
//!      ▲                                  TTL lapsed or       │
//!      └──────────────────────────────── save_settings() ─────┘
//! ```
//!
//! Concurrency: the batch mutex admits one sampler at a time. `current()`
//! callers queue on it and re-check the cache once inside, so they all observe
//! the snapshot produced by whoever got there first. `refresh()` uses
//! `try_lock` and returns [`RefreshOutcome::InProgress`] instead of queueing.
//!
//! Each probe runs on a short-lived worker thread and the sampler waits at
//! most the probe budget for its answer. A worker that overruns keeps the
//! source locked until it returns; later probes on that source fail fast as
//! busy instead of queueing behind it.

pub mod cache;
pub mod settings;
pub mod snapshot;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collector::traits::{LiveMetricsSource, ProbeError, SlowQuerySource};
use crate::fmt::{bytes_to_mb, round2};
use crate::slowlog;
use cache::TtlCache;
use settings::{LiveDbSettings, SettingsError, SettingsInput, SettingsStore, load_or_default};
use snapshot::{LiveMetricsSnapshot, Metric};

/// Cache slot holding the latest snapshot.
pub const LIVE_CACHE_KEY: &str = "live_db_metrics";

/// Lifetime of a cached snapshot.
pub const LIVE_CACHE_TTL: Duration = Duration::from_secs(5);

/// A probe running longer than this is treated as failed.
pub const DEFAULT_PROBE_BUDGET: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SamplerState {
    Disabled,
    Idle,
    Sampling,
    CacheFresh,
}

/// Result of an explicit refresh request.
#[derive(Clone, Debug)]
pub enum RefreshOutcome {
    /// A new probe batch ran.
    Sampled(Arc<LiveMetricsSnapshot>),
    /// The cached snapshot is still within its TTL.
    Cached(Arc<LiveMetricsSnapshot>),
    /// Another sample is in flight; carries the last known snapshot, if any.
    InProgress(Option<Arc<LiveMetricsSnapshot>>),
    Disabled(Arc<LiveMetricsSnapshot>),
}

impl RefreshOutcome {
    pub fn snapshot(&self) -> Option<&Arc<LiveMetricsSnapshot>> {
        match self {
            RefreshOutcome::Sampled(s) | RefreshOutcome::Cached(s) | RefreshOutcome::Disabled(s) => {
                Some(s)
            }
            RefreshOutcome::InProgress(s) => s.as_ref(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            RefreshOutcome::Sampled(_) => "sampled",
            RefreshOutcome::Cached(_) => "cached",
            RefreshOutcome::InProgress(_) => "in_progress",
            RefreshOutcome::Disabled(_) => "disabled",
        }
    }
}

/// A source shared with the probe workers. Locked for the duration of one probe call.
type SharedSource<S> = Arc<Mutex<Box<S>>>;

pub struct LiveMetricsSampler {
    /// Held for a whole probe batch (and by `with_live_source`).
    batch: Mutex<()>,
    live: SharedSource<dyn LiveMetricsSource>,
    slow: Option<SharedSource<dyn SlowQuerySource>>,
    cache: TtlCache<Arc<LiveMetricsSnapshot>>,
    store: Arc<dyn SettingsStore>,
    /// Serializes read-modify-write of the settings record.
    settings_lock: Mutex<()>,
    /// Set while a probe batch runs.
    sampling: AtomicBool,
    /// Bumped by `save_settings`; a batch started under an older generation is not cached.
    generation: AtomicU64,
    last: Mutex<Option<Arc<LiveMetricsSnapshot>>>,
    cache_ttl: Duration,
    probe_budget: Duration,
    epoch: Instant,
}

impl LiveMetricsSampler {
    pub fn new(live: Box<dyn LiveMetricsSource>, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            batch: Mutex::new(()),
            live: Arc::new(Mutex::new(live)),
            slow: None,
            cache: TtlCache::new(),
            store,
            settings_lock: Mutex::new(()),
            sampling: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            last: Mutex::new(None),
            cache_ttl: LIVE_CACHE_TTL,
            probe_budget: DEFAULT_PROBE_BUDGET,
            epoch: Instant::now(),
        }
    }

    pub fn with_slow_query_source(mut self, source: Box<dyn SlowQuerySource>) -> Self {
        self.slow = Some(Arc::new(Mutex::new(source)));
        self
    }

    /// Sets the snapshot lifetime.
    ///
    /// Default: 5 seconds.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_probe_budget(mut self, budget: Duration) -> Self {
        self.probe_budget = budget;
        self
    }

    /// Current settings, read from the store.
    pub fn settings(&self) -> LiveDbSettings {
        load_or_default(self.store.as_ref())
    }

    /// Clamps and persists a settings update, then invalidates the cached snapshot.
    pub fn save_settings(&self, input: &SettingsInput) -> Result<LiveDbSettings, SettingsError> {
        let _guard = self.settings_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let updated = self.settings().merged(input);
        self.store.save(&updated)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.remove(LIVE_CACHE_KEY);
        info!(
            enabled = updated.enabled,
            interval = updated.interval_seconds,
            max_patterns = updated.max_patterns,
            lightweight_mode = updated.lightweight_mode,
            "live monitor settings saved"
        );
        Ok(updated)
    }

    pub fn state(&self) -> SamplerState {
        if !self.settings().enabled {
            SamplerState::Disabled
        } else if self.sampling.load(Ordering::SeqCst) {
            SamplerState::Sampling
        } else if self.cache.get(LIVE_CACHE_KEY).is_some() {
            SamplerState::CacheFresh
        } else {
            SamplerState::Idle
        }
    }

    /// Returns the cached snapshot, sampling first if the cache is empty or stale.
    ///
    /// Callers arriving while a sample is in flight wait for it and get its result.
    pub fn current(&self) -> Arc<LiveMetricsSnapshot> {
        let settings = self.settings();
        if !settings.enabled {
            return self.disabled_snapshot();
        }
        if let Some(snap) = self.cache.get(LIVE_CACHE_KEY) {
            return snap;
        }

        let _batch = self.batch.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(snap) = self.cache.get(LIVE_CACHE_KEY) {
            return snap;
        }
        self.sample_locked(&settings)
    }

    /// Requests a sample without queueing behind one already in flight.
    pub fn refresh(&self) -> RefreshOutcome {
        let settings = self.settings();
        if !settings.enabled {
            return RefreshOutcome::Disabled(self.disabled_snapshot());
        }

        let _batch = match self.batch.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("live sample already in progress");
                return RefreshOutcome::InProgress(self.last_snapshot());
            }
        };
        if let Some(snap) = self.cache.get(LIVE_CACHE_KEY) {
            return RefreshOutcome::Cached(snap);
        }
        RefreshOutcome::Sampled(self.sample_locked(&settings))
    }

    /// Most recent successful snapshot, regardless of TTL.
    pub fn last_snapshot(&self) -> Option<Arc<LiveMetricsSnapshot>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Runs `f` with exclusive access to the live source.
    ///
    /// Used for one-off reads (performance diagnostics) that must not overlap
    /// a sampling cycle on the same connection. Waits for an overrunning
    /// probe worker to release the source.
    pub fn with_live_source<R>(&self, f: impl FnOnce(&mut dyn LiveMetricsSource) -> R) -> R {
        let _batch = self.batch.lock().unwrap_or_else(PoisonError::into_inner);
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **live)
    }

    fn disabled_snapshot(&self) -> Arc<LiveMetricsSnapshot> {
        Arc::new(LiveMetricsSnapshot::disabled(
            chrono::Utc::now().timestamp_millis(),
            self.monotonic_ms(),
        ))
    }

    fn monotonic_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Runs one probe batch. Caller holds the batch lock.
    fn sample_locked(&self, settings: &LiveDbSettings) -> Arc<LiveMetricsSnapshot> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.sampling.store(true, Ordering::SeqCst);
        let start = Instant::now();

        let snap = Arc::new(self.collect(settings));

        self.sampling.store(false, Ordering::SeqCst);
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            warnings = snap.warnings.len(),
            patterns = snap.slow_query_patterns.len(),
            "live sample collected"
        );

        if self.generation.load(Ordering::SeqCst) == generation {
            self.cache.set(LIVE_CACHE_KEY, Arc::clone(&snap), self.cache_ttl);
        } else {
            debug!("settings changed during sample, not caching");
        }
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snap));
        snap
    }

    fn collect(&self, settings: &LiveDbSettings) -> LiveMetricsSnapshot {
        let mut warnings = Vec::new();
        let live = &self.live;

        let response_ms = self
            .probe("Response time", live, &mut warnings, |s| s.response_time_ms())
            .map(round2);
        let autoload_mb = self
            .probe("Autoload size", live, &mut warnings, |s| s.autoload_bytes())
            .map(bytes_to_mb);
        let revision_count = self
            .probe("Revision count", live, &mut warnings, |s| s.revision_count())
            .map(|n| n as f64);

        let (db_size_mb, threads_connected, slow_query_count) = if settings.lightweight_mode {
            warnings.push("Database size skipped: lightweight mode is enabled".to_string());
            warnings.push("Server status counters skipped: lightweight mode is enabled".to_string());
            (None, None, None)
        } else {
            let size = self
                .probe("Database size", live, &mut warnings, |s| s.database_size_bytes())
                .map(bytes_to_mb);
            let status = self.probe("Server status counters", live, &mut warnings, |s| {
                s.status_counters()
            });
            (
                size,
                status.map(|s| s.threads_connected as f64),
                status.map(|s| s.slow_queries as f64),
            )
        };

        let slow_query_patterns = match &self.slow {
            Some(source) => {
                let (samples, dialect) = self
                    .probe("Slow query samples", source, &mut warnings, |s| {
                        s.slow_query_samples().map(|samples| (samples, s.dialect()))
                    })
                    .unwrap_or_default();
                if samples.is_empty() {
                    warnings.push("No slow query samples available".to_string());
                }
                slowlog::aggregate_as(&samples, settings.max_patterns, dialect)
            }
            None => {
                warnings.push("No slow query source configured".to_string());
                Vec::new()
            }
        };

        LiveMetricsSnapshot {
            response_ms: Metric::from(response_ms),
            autoload_mb: Metric::from(autoload_mb),
            db_size_mb: Metric::from(db_size_mb),
            revision_count: Metric::from(revision_count),
            threads_connected: Metric::from(threads_connected),
            slow_query_count: Metric::from(slow_query_count),
            warnings,
            slow_query_patterns,
            sampled_at: chrono::Utc::now().timestamp_millis(),
            monotonic_ms: self.monotonic_ms(),
        }
    }

    /// Runs one probe on a worker thread, waiting at most the probe budget.
    ///
    /// Failures, overruns and a source still held by an earlier overrunning
    /// worker all become a warning and `None`.
    fn probe<S, T, F>(
        &self,
        label: &str,
        source: &SharedSource<S>,
        warnings: &mut Vec<String>,
        f: F,
    ) -> Option<T>
    where
        S: ?Sized + Send + 'static,
        T: Send + 'static,
        F: FnOnce(&mut S) -> Result<T, ProbeError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(source);
        let spawned = thread::Builder::new()
            .name("live-probe".to_string())
            .spawn(move || {
                let result = match source.try_lock() {
                    Ok(mut guard) => f(&mut **guard),
                    Err(TryLockError::Poisoned(p)) => f(&mut **p.into_inner()),
                    Err(TryLockError::WouldBlock) => Err(ProbeError::Failed(
                        "source still busy with an overrunning probe".to_string(),
                    )),
                };
                // the sampler may have stopped waiting
                let _ = tx.send(result);
            });

        let result = match spawned {
            Ok(_) => match rx.recv_timeout(self.probe_budget) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        probe = label,
                        budget_ms = self.probe_budget.as_millis() as u64,
                        "live probe over budget, abandoning"
                    );
                    Err(ProbeError::TimedOut(self.probe_budget))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    Err(ProbeError::Failed("probe worker panicked".to_string()))
                }
            },
            Err(e) => Err(ProbeError::Failed(format!("cannot spawn probe worker: {e}"))),
        };

        match result {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(probe = label, error = %e, "live probe failed");
                warnings.push(format!("{label} not available: {e}"));
                None
            }
        }
    }
}
