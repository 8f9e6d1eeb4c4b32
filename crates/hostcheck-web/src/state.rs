//! Shared application state and global statics.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hostcheck_core::analysis::Analyzer;
use hostcheck_core::live::LiveMetricsSampler;

/// Default bound on a single blocking request (report, live sample, settings write).
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) analyzer: Arc<Analyzer>,
    pub(crate) sampler: Arc<LiveMetricsSampler>,
    pub(crate) request_timeout: Duration,
}

impl AppState {
    pub(crate) fn new(analyzer: Analyzer, sampler: LiveMetricsSampler) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            sampler: Arc::new(sampler),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub(crate) fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Unix seconds of the last API request; the background warmer idles without clients.
pub(crate) static LAST_CLIENT_ACTIVITY: AtomicI64 = AtomicI64::new(0);

pub(crate) fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
