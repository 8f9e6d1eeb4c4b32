//! Probe adapter that caches slow version lookups.

use std::collections::HashSet;
use std::time::Duration;

use tracing::debug;

use super::traits::{EnvironmentProbe, HostFacts, ProbeError, ResourceCounters};
use crate::live::cache::TtlCache;
use crate::value::Value;

/// How long a data-store version read stays cached.
pub const VERSION_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Wraps a probe and caches `version()` for selected components.
///
/// Only successful reads are cached; a failed read is retried on the next call.
pub struct CachedProbe<P> {
    inner: P,
    cache: TtlCache<String>,
    cached_components: HashSet<String>,
    ttl: Duration,
}

impl<P: EnvironmentProbe> CachedProbe<P> {
    /// Caches the `mysql` component (the data store) for [`VERSION_CACHE_TTL`].
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: TtlCache::new(),
            cached_components: HashSet::from(["mysql".to_string()]),
            ttl: VERSION_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_component(mut self, component: &str) -> Self {
        self.cached_components.insert(component.to_string());
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: EnvironmentProbe> EnvironmentProbe for CachedProbe<P> {
    fn version(&self, component: &str) -> Result<String, ProbeError> {
        if !self.cached_components.contains(component) {
            return self.inner.version(component);
        }
        let key = format!("version:{component}");
        if let Some(v) = self.cache.get(&key) {
            return Ok(v);
        }
        let v = self.inner.version(component)?;
        debug!(component, version = %v, "caching component version");
        self.cache.set(&key, v.clone(), self.ttl);
        Ok(v)
    }

    fn has_extension(&self, name: &str) -> Result<bool, ProbeError> {
        self.inner.has_extension(name)
    }

    fn config_value(&self, key: &str) -> Result<Value, ProbeError> {
        self.inner.config_value(key)
    }

    fn server_software(&self) -> Result<String, ProbeError> {
        self.inner.server_software()
    }

    fn runtime_sapi(&self) -> Result<String, ProbeError> {
        self.inner.runtime_sapi()
    }

    fn resource_counters(&self) -> ResourceCounters {
        self.inner.resource_counters()
    }

    fn host_facts(&self) -> HostFacts {
        self.inner.host_facts()
    }

    fn filesystem_latency(&self) -> Result<Duration, ProbeError> {
        self.inner.filesystem_latency()
    }
}
