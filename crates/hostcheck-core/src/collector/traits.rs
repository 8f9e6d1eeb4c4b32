//! Probe traits consumed by the diagnostic engine and the live sampler.
//!
//! Implementations are external collaborators: they read the host (or a data
//! store) and hand back raw values. They never classify anything.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::slowlog::{SlowQuerySample, SqlDialect};
use crate::value::Value;

/// Error type for a single probe call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// The component or value does not exist on this host.
    Unavailable(String),
    /// The value exists but host policy prevents reading it.
    Restricted(String),
    /// The probe ran and failed.
    Failed(String),
    /// The probe exceeded its time budget.
    TimedOut(Duration),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Unavailable(what) => write!(f, "{what} unavailable"),
            ProbeError::Restricted(what) => write!(f, "{what} restricted by host policy"),
            ProbeError::Failed(msg) => write!(f, "probe failed: {msg}"),
            ProbeError::TimedOut(d) => write!(f, "probe timed out after {} ms", d.as_millis()),
        }
    }
}

impl std::error::Error for ProbeError {}

// ============================================================
// Environment
// ============================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCounters {
    pub total_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub free_bytes: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuCounters {
    pub model: Option<String>,
    pub cores: Option<u32>,
    /// 1, 5 and 15 minute load averages.
    pub load_average: Option<[f64; 3]>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageCounters {
    pub total_bytes: Option<u64>,
    pub free_bytes: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkCounters {
    pub hostname: Option<String>,
    pub server_ip: Option<String>,
}

/// OS-level resource counters. Any field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCounters {
    pub memory: MemoryCounters,
    pub cpu: CpuCounters,
    pub storage: StorageCounters,
    pub network: NetworkCounters,
}

/// Web server and OS identity as seen by the request handler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerFacts {
    /// Kernel name, e.g. `Linux`.
    pub os_name: Option<String>,
    /// Kernel release, e.g. `6.1.0-18-amd64`.
    pub os_release: Option<String>,
    /// Machine hardware name, e.g. `x86_64`.
    pub machine: Option<String>,
    pub server_name: Option<String>,
    pub server_port: Option<u16>,
    pub server_protocol: Option<String>,
    pub document_root: Option<String>,
    pub server_admin: Option<String>,
    /// Raw `HTTPS` server variable (`on`, `off`, `1`, ...).
    pub https: Option<String>,
    /// `X-Forwarded-Proto` set by a terminating proxy.
    pub forwarded_proto: Option<String>,
    pub uptime_seconds: Option<f64>,
}

/// Site-level settings of the hosted application.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteFacts {
    pub platform_version: Option<String>,
    pub debug_mode: Option<bool>,
    pub memory_limit: Option<String>,
    pub max_memory_limit: Option<String>,
    pub multisite: Option<bool>,
    pub active_theme: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub site_url: Option<String>,
    pub home_url: Option<String>,
}

/// TLS certificate and response header facts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityFacts {
    /// Common name of the certificate issuer.
    pub certificate_issuer: Option<String>,
    /// Certificate `notAfter`, Unix seconds.
    pub certificate_expires_at: Option<i64>,
    /// Names of the headers the site sends.
    pub response_headers: Option<Vec<String>>,
}

/// Application-level facts used by the performance heuristics and the
/// host information rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostFacts {
    /// Slugs of active plugins, if the host can list them.
    pub active_plugins: Option<Vec<String>>,
    /// Whether a persistent object cache backend is in use.
    pub external_object_cache: Option<bool>,
    pub server: ServerFacts,
    pub site: SiteFacts,
    pub security: SecurityFacts,
}

/// Supplies current environment values.
///
/// Every method is total from the engine's point of view: an `Err` becomes a
/// "Not available" row, never a failed evaluation.
pub trait EnvironmentProbe: Send + Sync {
    /// Version string of a component (`"php"`, `"mysql"`, ...).
    fn version(&self, component: &str) -> Result<String, ProbeError>;

    /// Whether a runtime extension is loaded.
    fn has_extension(&self, name: &str) -> Result<bool, ProbeError>;

    /// Raw value of a configuration directive.
    fn config_value(&self, key: &str) -> Result<Value, ProbeError>;

    /// Raw web server software string (e.g. `"Apache/2.4.57 (Debian)"`).
    fn server_software(&self) -> Result<String, ProbeError>;

    /// Runtime server API name (e.g. `"fpm-fcgi"`).
    fn runtime_sapi(&self) -> Result<String, ProbeError>;

    fn resource_counters(&self) -> ResourceCounters;

    fn host_facts(&self) -> HostFacts;

    /// Time to write, read back and delete a small scratch file.
    fn filesystem_latency(&self) -> Result<Duration, ProbeError> {
        Err(ProbeError::Unavailable("filesystem timing".to_string()))
    }
}

// ============================================================
// Live data store
// ============================================================

/// Server status counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounters {
    pub threads_connected: u64,
    pub slow_queries: u64,
}

/// Volatile data-store metrics polled by the live sampler.
///
/// Methods take `&mut self` because real sources hold a connection. The
/// sampler serializes all calls.
pub trait LiveMetricsSource: Send {
    /// Round-trip time of a trivial query, in milliseconds.
    fn response_time_ms(&mut self) -> Result<f64, ProbeError>;

    /// Total size of autoloaded options, in bytes.
    fn autoload_bytes(&mut self) -> Result<u64, ProbeError>;

    /// Number of stored post revisions.
    fn revision_count(&mut self) -> Result<u64, ProbeError>;

    /// Schema-wide size in bytes. Expensive on large installs.
    fn database_size_bytes(&mut self) -> Result<u64, ProbeError>;

    fn status_counters(&mut self) -> Result<StatusCounters, ProbeError>;

    /// Reclaimable space held by tables, in bytes. Expensive on large installs.
    fn table_overhead_bytes(&mut self) -> Result<u64, ProbeError> {
        Err(ProbeError::Unavailable("table overhead".to_string()))
    }
}

/// Provider of raw slow-query records.
pub trait SlowQuerySource: Send {
    fn slow_query_samples(&mut self) -> Result<Vec<SlowQuerySample>, ProbeError>;

    /// Lexical rules used to normalize the returned query text.
    fn dialect(&self) -> SqlDialect {
        SqlDialect::MySql
    }
}
