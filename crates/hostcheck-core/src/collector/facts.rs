//! Environment probe backed by a JSON facts document.
//!
//! The host-side collector (outside this crate) dumps what it can read into a
//! JSON file; this probe serves those values to the evaluator. Anything absent
//! from the document is reported as unavailable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::traits::{EnvironmentProbe, HostFacts, ProbeError, ResourceCounters};
use crate::value::Value;

/// On-disk shape of the facts document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentFacts {
    /// Component name to version string.
    pub versions: HashMap<String, String>,
    /// Names of loaded extensions.
    pub extensions: Vec<String>,
    pub config: HashMap<String, Value>,
    /// Keys the host refused to disclose.
    pub restricted: Vec<String>,
    pub server_software: Option<String>,
    pub sapi: Option<String>,
    pub resources: ResourceCounters,
    pub host: HostFacts,
}

/// Written and read back by the filesystem timing probe.
const SCRATCH_PAYLOAD: &[u8] = b"test";

pub struct FactsProbe {
    facts: EnvironmentFacts,
    /// Directory for the filesystem timing file. Timing is unavailable without one.
    scratch_dir: Option<PathBuf>,
    scratch_seq: AtomicU64,
}

impl FactsProbe {
    pub fn new(facts: EnvironmentFacts) -> Self {
        Self {
            facts,
            scratch_dir: None,
            scratch_seq: AtomicU64::new(0),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ProbeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProbeError::Unavailable(format!("{}: {e}", path.display())))?;
        let facts = serde_json::from_str(&text)
            .map_err(|e| ProbeError::Failed(format!("{}: {e}", path.display())))?;
        Ok(Self::new(facts))
    }

    fn check_restricted(&self, key: &str) -> Result<(), ProbeError> {
        if self.facts.restricted.iter().any(|r| r == key) {
            Err(ProbeError::Restricted(key.to_string()))
        } else {
            Ok(())
        }
    }
}

impl EnvironmentProbe for FactsProbe {
    fn version(&self, component: &str) -> Result<String, ProbeError> {
        self.check_restricted(component)?;
        self.facts
            .versions
            .get(component)
            .cloned()
            .ok_or_else(|| ProbeError::Unavailable(component.to_string()))
    }

    fn has_extension(&self, name: &str) -> Result<bool, ProbeError> {
        self.check_restricted(name)?;
        Ok(self
            .facts
            .extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(name)))
    }

    fn config_value(&self, key: &str) -> Result<Value, ProbeError> {
        self.check_restricted(key)?;
        match self.facts.config.get(key) {
            Some(Value::NotAvailable) | None => Err(ProbeError::Unavailable(key.to_string())),
            Some(v) => Ok(v.clone()),
        }
    }

    fn server_software(&self) -> Result<String, ProbeError> {
        self.facts
            .server_software
            .clone()
            .ok_or_else(|| ProbeError::Unavailable("server software".to_string()))
    }

    fn runtime_sapi(&self) -> Result<String, ProbeError> {
        self.facts
            .sapi
            .clone()
            .ok_or_else(|| ProbeError::Unavailable("sapi".to_string()))
    }

    fn resource_counters(&self) -> ResourceCounters {
        self.facts.resources.clone()
    }

    fn host_facts(&self) -> HostFacts {
        self.facts.host.clone()
    }

    fn filesystem_latency(&self) -> Result<Duration, ProbeError> {
        let dir = self
            .scratch_dir
            .as_ref()
            .ok_or_else(|| ProbeError::Unavailable("filesystem timing".to_string()))?;
        let seq = self.scratch_seq.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!(".hostcheck-fs-{}-{seq}.tmp", std::process::id()));

        let start = Instant::now();
        let io = std::fs::write(&path, SCRATCH_PAYLOAD).and_then(|()| std::fs::read(&path));
        let removed = std::fs::remove_file(&path);
        let elapsed = start.elapsed();

        io.and(removed)
            .map_err(|e| ProbeError::Failed(format!("{}: {e}", path.display())))?;
        Ok(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTS: &str = r#"{
        "versions": {"php": "8.1.27", "mysql": "10.6.12-MariaDB"},
        "extensions": ["curl", "GD", "mbstring"],
        "config": {"memory_limit": "256M", "max_input_vars": 3000, "file_uploads": true, "post_max_size": null},
        "restricted": ["max_execution_time"],
        "server_software": "LiteSpeed",
        "resources": {"memory": {"total_bytes": 8589934592}},
        "host": {
            "external_object_cache": false,
            "server": {"os_name": "Linux", "machine": "aarch64", "https": "on"},
            "security": {"response_headers": ["X-Frame-Options"]}
        }
    }"#;

    fn probe() -> FactsProbe {
        FactsProbe::new(serde_json::from_str(FACTS).unwrap())
    }

    #[test]
    fn test_reads_values_from_document() {
        let p = probe();
        assert_eq!(p.version("mysql").unwrap(), "10.6.12-MariaDB");
        assert_eq!(p.has_extension("gd"), Ok(true));
        assert_eq!(p.has_extension("zip"), Ok(false));
        assert_eq!(p.config_value("max_input_vars").unwrap(), Value::Numeric(3000));
        assert_eq!(p.config_value("file_uploads").unwrap(), Value::Bool(true));
        assert_eq!(p.resource_counters().memory.total_bytes, Some(8_589_934_592));
        assert_eq!(p.host_facts().external_object_cache, Some(false));
        assert_eq!(p.host_facts().server.machine.as_deref(), Some("aarch64"));
        assert_eq!(p.host_facts().site.platform_version, None);
    }

    #[test]
    fn test_filesystem_timing_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let p = probe().with_scratch_dir(dir.path());
        assert!(p.filesystem_latency().is_ok());
        assert!(p.filesystem_latency().is_ok());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_filesystem_timing_needs_writable_dir() {
        assert!(matches!(probe().filesystem_latency(), Err(ProbeError::Unavailable(_))));

        let dir = tempfile::tempdir().unwrap();
        let p = probe().with_scratch_dir(dir.path().join("missing"));
        assert!(matches!(p.filesystem_latency(), Err(ProbeError::Failed(_))));
    }

    #[test]
    fn test_absent_null_and_restricted_keys_fail() {
        let p = probe();
        assert!(matches!(p.config_value("post_max_size"), Err(ProbeError::Unavailable(_))));
        assert!(matches!(
            p.config_value("max_execution_time"),
            Err(ProbeError::Restricted(_))
        ));
        assert!(p.runtime_sapi().is_err());
    }

    #[test]
    fn test_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.json");
        std::fs::write(&path, FACTS).unwrap();
        let p = FactsProbe::from_json_file(&path).unwrap();
        assert_eq!(p.server_software().unwrap(), "LiteSpeed");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FactsProbe::from_json_file(&path),
            Err(ProbeError::Failed(_))
        ));
    }
}
