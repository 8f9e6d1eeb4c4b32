//! In-memory environment probe for testing the evaluator without a real host.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::collector::traits::{EnvironmentProbe, HostFacts, ProbeError, ResourceCounters};
use crate::value::Value;

/// Environment probe backed by maps.
///
/// Missing versions and config directives report [`ProbeError::Unavailable`];
/// missing extensions report "not loaded". Keys passed to [`MockProbe::restrict`]
/// report [`ProbeError::Restricted`] regardless of what is stored.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    versions: HashMap<String, String>,
    extensions: HashMap<String, bool>,
    config: HashMap<String, Value>,
    restricted: HashSet<String>,
    server_software: Option<String>,
    sapi: Option<String>,
    resources: ResourceCounters,
    facts: HostFacts,
    fs_latency: Option<Duration>,
    /// Shared across clones so tests can observe calls after handing the probe off.
    version_calls: Arc<AtomicUsize>,
}

impl MockProbe {
    /// Creates an empty probe: every lookup is unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, component: &str, version: &str) -> Self {
        self.versions.insert(component.to_string(), version.to_string());
        self
    }

    pub fn with_extension(mut self, name: &str, loaded: bool) -> Self {
        self.extensions.insert(name.to_string(), loaded);
        self
    }

    pub fn with_config(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    /// Makes any lookup of `key` fail as restricted.
    pub fn restrict(mut self, key: &str) -> Self {
        self.restricted.insert(key.to_string());
        self
    }

    pub fn with_server_software(mut self, software: &str) -> Self {
        self.server_software = Some(software.to_string());
        self
    }

    pub fn with_sapi(mut self, sapi: &str) -> Self {
        self.sapi = Some(sapi.to_string());
        self
    }

    pub fn with_resources(mut self, resources: ResourceCounters) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_facts(mut self, facts: HostFacts) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_filesystem_latency(mut self, latency: Duration) -> Self {
        self.fs_latency = Some(latency);
        self
    }

    /// Number of `version()` calls made on this probe or any clone of it.
    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    fn check_restricted(&self, key: &str) -> Result<(), ProbeError> {
        if self.restricted.contains(key) {
            Err(ProbeError::Restricted(key.to_string()))
        } else {
            Ok(())
        }
    }
}

impl EnvironmentProbe for MockProbe {
    fn version(&self, component: &str) -> Result<String, ProbeError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        self.check_restricted(component)?;
        self.versions
            .get(component)
            .cloned()
            .ok_or_else(|| ProbeError::Unavailable(component.to_string()))
    }

    fn has_extension(&self, name: &str) -> Result<bool, ProbeError> {
        self.check_restricted(name)?;
        Ok(self.extensions.get(name).copied().unwrap_or(false))
    }

    fn config_value(&self, key: &str) -> Result<Value, ProbeError> {
        self.check_restricted(key)?;
        self.config
            .get(key)
            .cloned()
            .ok_or_else(|| ProbeError::Unavailable(key.to_string()))
    }

    fn server_software(&self) -> Result<String, ProbeError> {
        self.server_software
            .clone()
            .ok_or_else(|| ProbeError::Unavailable("server software".to_string()))
    }

    fn runtime_sapi(&self) -> Result<String, ProbeError> {
        self.sapi
            .clone()
            .ok_or_else(|| ProbeError::Unavailable("sapi".to_string()))
    }

    fn resource_counters(&self) -> ResourceCounters {
        self.resources.clone()
    }

    fn host_facts(&self) -> HostFacts {
        self.facts.clone()
    }

    fn filesystem_latency(&self) -> Result<Duration, ProbeError> {
        self.fs_latency
            .ok_or_else(|| ProbeError::Unavailable("filesystem timing".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values() {
        let probe = MockProbe::new();
        assert!(matches!(probe.version("php"), Err(ProbeError::Unavailable(_))));
        assert_eq!(probe.has_extension("curl"), Ok(false));
        assert!(probe.config_value("memory_limit").is_err());
    }

    #[test]
    fn test_restricted_overrides_stored_value() {
        let probe = MockProbe::new()
            .with_config("memory_limit", "256M")
            .restrict("memory_limit");
        assert!(matches!(
            probe.config_value("memory_limit"),
            Err(ProbeError::Restricted(_))
        ));
    }

    #[test]
    fn test_version_calls_are_shared_between_clones() {
        let probe = MockProbe::new().with_version("php", "8.2.0");
        let clone = probe.clone();
        clone.version("php").unwrap();
        clone.version("mysql").unwrap_err();
        assert_eq!(probe.version_calls(), 2);
    }
}
