use crate::collector::traits::{LiveMetricsSource, ProbeError, StatusCounters};

/// Live source used when no data store connection is configured.
///
/// Every probe reports [`ProbeError::Unavailable`], so the sampler still
/// produces a snapshot with "Not available" fields and one warning per probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSource;

impl DetachedSource {
    fn unavailable<T>(&self) -> Result<T, ProbeError> {
        Err(ProbeError::Unavailable("no data store configured".to_string()))
    }
}

impl LiveMetricsSource for DetachedSource {
    fn response_time_ms(&mut self) -> Result<f64, ProbeError> {
        self.unavailable()
    }

    fn autoload_bytes(&mut self) -> Result<u64, ProbeError> {
        self.unavailable()
    }

    fn revision_count(&mut self) -> Result<u64, ProbeError> {
        self.unavailable()
    }

    fn database_size_bytes(&mut self) -> Result<u64, ProbeError> {
        self.unavailable()
    }

    fn status_counters(&mut self) -> Result<StatusCounters, ProbeError> {
        self.unavailable()
    }
}
