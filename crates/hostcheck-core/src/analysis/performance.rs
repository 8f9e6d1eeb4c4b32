//! Heuristic performance checks.
//!
//! Facts are gathered once from the environment probe and, when available, the
//! live data-store source. [`diagnose`] is pure over those facts: a fact the
//! host could not supply skips its check instead of producing an issue.

use serde::Serialize;
use tracing::debug;

use super::Severity;
use crate::collector::traits::{EnvironmentProbe, LiveMetricsSource, ProbeError};
use crate::fmt::format_decimal;
use crate::live::settings::LiveDbSettings;
use crate::value::{Value, compare_versions, parse_version};

const MB: u64 = 1024 * 1024;

const DATABASE_SIZE_LIMIT_MB: f64 = 1000.0;
const TABLE_OVERHEAD_LIMIT: u64 = 10 * MB;
const REVISION_LIMIT: u64 = 1000;
const PLUGINS_CRITICAL: usize = 30;
const PLUGINS_WARNING: usize = 20;
const MEMORY_LIMIT_MIN: i64 = 256 * MB as i64;
const EXECUTION_TIME_MIN: i64 = 60;
const AUTOLOAD_CRITICAL: u64 = MB;
const AUTOLOAD_WARNING: u64 = 512 * 1024;

const PAGE_BUILDERS: [&str; 5] = ["elementor", "divi", "beaver-builder", "wpbakery", "oxygen"];
const PAGE_CACHE_PLUGINS: [&str; 5] = [
    "wp-super-cache",
    "w3-total-cache",
    "wp-rocket",
    "litespeed-cache",
    "wp-fastest-cache",
];

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct PerformanceIssue {
    pub title: String,
    pub severity: Severity,
    pub value: String,
    pub description: String,
    pub recommendation: String,
}

impl PerformanceIssue {
    fn new(
        title: &str,
        severity: Severity,
        value: impl Into<String>,
        description: &str,
        recommendation: &str,
    ) -> Self {
        Self {
            title: title.to_string(),
            severity,
            value: value.into(),
            description: description.to_string(),
            recommendation: recommendation.to_string(),
        }
    }
}

// ============================================================
// Facts
// ============================================================

/// Inputs to the heuristics. `None` means the host could not supply the fact.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerformanceFacts {
    pub lightweight_mode: bool,
    pub database_size_bytes: Option<u64>,
    pub table_overhead_bytes: Option<u64>,
    pub revisions: Option<u64>,
    pub autoload_bytes: Option<u64>,
    pub active_plugins: Option<Vec<String>>,
    pub external_object_cache: Option<bool>,
    pub memory_limit: Option<String>,
    pub max_execution_time: Option<i64>,
    pub runtime_version: Option<String>,
    /// Round-trip of a trivial data-store query, milliseconds.
    pub response_ms: Option<f64>,
}

fn ok_or_log<T>(probe: &'static str, result: Result<T, ProbeError>) -> Option<T> {
    result
        .map_err(|e| debug!(probe, error = %e, "performance fact unavailable"))
        .ok()
}

impl PerformanceFacts {
    /// Collects facts. Lightweight mode skips the schema-wide size and overhead probes.
    pub fn gather(
        probe: &dyn EnvironmentProbe,
        live: Option<&mut dyn LiveMetricsSource>,
        settings: &LiveDbSettings,
    ) -> Self {
        let facts = probe.host_facts();
        let mut out = Self {
            lightweight_mode: settings.lightweight_mode,
            active_plugins: facts.active_plugins,
            external_object_cache: facts.external_object_cache,
            memory_limit: ok_or_log("memory_limit", probe.config_value("memory_limit"))
                .filter(Value::is_available)
                .map(|v| v.to_string()),
            max_execution_time: ok_or_log(
                "max_execution_time",
                probe.config_value("max_execution_time"),
            )
            .and_then(|v| v.magnitude()),
            runtime_version: ok_or_log("php", probe.version("php")),
            ..Default::default()
        };

        if let Some(live) = live {
            out.response_ms = ok_or_log("response_time", live.response_time_ms());
            out.revisions = ok_or_log("revisions", live.revision_count());
            out.autoload_bytes = ok_or_log("autoload", live.autoload_bytes());
            if !settings.lightweight_mode {
                out.database_size_bytes = ok_or_log("db_size", live.database_size_bytes());
                out.table_overhead_bytes = ok_or_log("table_overhead", live.table_overhead_bytes());
            }
        }
        out
    }
}

// ============================================================
// Checks
// ============================================================

/// Runs every heuristic in report order: database, plugins, page builder,
/// caching, server limits, autoload.
pub fn diagnose(facts: &PerformanceFacts) -> Vec<PerformanceIssue> {
    let mut issues = Vec::new();
    check_database(facts, &mut issues);
    check_plugins(facts, &mut issues);
    check_page_builder(facts, &mut issues);
    check_caching(facts, &mut issues);
    check_server_limits(facts, &mut issues);
    check_autoload(facts, &mut issues);
    issues
}

fn check_database(facts: &PerformanceFacts, issues: &mut Vec<PerformanceIssue>) {
    if facts.lightweight_mode {
        issues.push(PerformanceIssue::new(
            "Lightweight Mode Active",
            Severity::Info,
            "Enabled",
            "Heavy database probes are skipped to reduce load on restrictive/shared hosting.",
            "Disable lightweight mode in Live Monitor Settings if you need full database size/overhead analysis.",
        ));
    } else {
        if let Some(bytes) = facts.database_size_bytes {
            let mb = bytes as f64 / MB as f64;
            if mb > DATABASE_SIZE_LIMIT_MB {
                issues.push(PerformanceIssue::new(
                    "Large Database Size",
                    Severity::Warning,
                    format!("{} MB", format_decimal(mb)),
                    "Your database is quite large which can slow down queries.",
                    "Consider cleaning up old revisions, spam comments, and transients.",
                ));
            }
        }
        if let Some(overhead) = facts.table_overhead_bytes.filter(|b| *b > TABLE_OVERHEAD_LIMIT) {
            issues.push(PerformanceIssue::new(
                "Database Tables Need Optimization",
                Severity::Warning,
                format!("{} MB overhead", format_decimal(overhead as f64 / MB as f64)),
                "Your database tables have overhead that can be optimized.",
                "Run database optimization using a plugin like WP-Optimize.",
            ));
        }
    }

    if let Some(revisions) = facts.revisions.filter(|n| *n > REVISION_LIMIT) {
        issues.push(PerformanceIssue::new(
            "Excessive Post Revisions",
            Severity::Warning,
            format!("{revisions} revisions"),
            "Too many post revisions can bloat your database.",
            "Limit revisions by adding define('WP_POST_REVISIONS', 5); to wp-config.php",
        ));
    }
}

fn check_plugins(facts: &PerformanceFacts, issues: &mut Vec<PerformanceIssue>) {
    let Some(count) = facts.active_plugins.as_ref().map(Vec::len) else {
        return;
    };
    if count > PLUGINS_CRITICAL {
        issues.push(PerformanceIssue::new(
            "Too Many Active Plugins",
            Severity::Critical,
            format!("{count} plugins"),
            "Having too many plugins can significantly slow down your site.",
            "Deactivate and remove plugins you don't need. Consider combining functionality.",
        ));
    } else if count > PLUGINS_WARNING {
        issues.push(PerformanceIssue::new(
            "Many Active Plugins",
            Severity::Warning,
            format!("{count} plugins"),
            "Consider reducing the number of active plugins.",
            "Review your plugins and deactivate any that aren't essential.",
        ));
    }
}

/// First known page builder found among active plugins, as a display name.
pub fn detect_page_builder(plugins: &[String]) -> Option<String> {
    let builder = PAGE_BUILDERS
        .iter()
        .find(|b| plugins.iter().any(|p| p.contains(*b)))?;
    let name = builder.replace('-', " ");
    let mut chars = name.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
}

fn check_page_builder(facts: &PerformanceFacts, issues: &mut Vec<PerformanceIssue>) {
    let Some(name) = facts.active_plugins.as_deref().and_then(detect_page_builder) else {
        return;
    };
    issues.push(PerformanceIssue::new(
        "Page Builder Detected",
        Severity::Info,
        name,
        "Page builders can add overhead to your site.",
        "Ensure you're using caching and consider optimizing page builder output.",
    ));
}

fn check_caching(facts: &PerformanceFacts, issues: &mut Vec<PerformanceIssue>) {
    if facts.external_object_cache == Some(false) {
        issues.push(PerformanceIssue::new(
            "No Object Caching",
            Severity::Critical,
            "Not Active",
            "Object caching can dramatically improve database performance.",
            "Install Redis or Memcached for object caching.",
        ));
    }

    if let Some(plugins) = &facts.active_plugins {
        let has_page_cache = PAGE_CACHE_PLUGINS
            .iter()
            .any(|c| plugins.iter().any(|p| p.contains(c)));
        if !has_page_cache {
            issues.push(PerformanceIssue::new(
                "No Page Caching Plugin",
                Severity::Critical,
                "Not Active",
                "Page caching is essential for WordPress performance.",
                "Install a caching plugin like WP Rocket, LiteSpeed Cache, or W3 Total Cache.",
            ));
        }
    }
}

fn check_server_limits(facts: &PerformanceFacts, issues: &mut Vec<PerformanceIssue>) {
    if let Some(raw) = &facts.memory_limit {
        // -1 means no limit
        let low = crate::value::to_bytes(raw).is_some_and(|b| b != -1 && b < MEMORY_LIMIT_MIN);
        if low {
            issues.push(PerformanceIssue::new(
                "Low PHP Memory Limit",
                Severity::Critical,
                raw.clone(),
                "Low memory limit can cause slow performance and errors.",
                "Increase PHP memory_limit to at least 256M in php.ini or wp-config.php",
            ));
        }
    }

    if let Some(secs) = facts
        .max_execution_time
        .filter(|s| *s != 0 && *s < EXECUTION_TIME_MIN)
    {
        issues.push(PerformanceIssue::new(
            "Low Max Execution Time",
            Severity::Warning,
            format!("{secs}s"),
            "Short execution time can cause timeouts.",
            "Increase max_execution_time to at least 60 seconds.",
        ));
    }

    if let Some(version) = &facts.runtime_version {
        let outdated = parse_version(version)
            .is_some_and(|v| compare_versions(&v, &[8, 0]) == std::cmp::Ordering::Less);
        if outdated {
            issues.push(PerformanceIssue::new(
                "Outdated PHP Version",
                Severity::Critical,
                version.clone(),
                "Older PHP versions are slower and less secure.",
                "Upgrade to PHP 8.0 or higher for better performance.",
            ));
        }
    }
}

fn check_autoload(facts: &PerformanceFacts, issues: &mut Vec<PerformanceIssue>) {
    let Some(bytes) = facts.autoload_bytes else {
        return;
    };
    if bytes > AUTOLOAD_CRITICAL {
        issues.push(PerformanceIssue::new(
            "Large Autoload Data",
            Severity::Critical,
            format!("{} MB", format_decimal(bytes as f64 / MB as f64)),
            "Too much autoloaded data slows down every page load.",
            "Review and clean up autoloaded options. Use a plugin like Query Monitor to identify large autoloaded options.",
        ));
    } else if bytes > AUTOLOAD_WARNING {
        issues.push(PerformanceIssue::new(
            "Moderate Autoload Data",
            Severity::Warning,
            format!("{} KB", format_decimal(bytes as f64 / 1024.0)),
            "Autoloaded data is getting large.",
            "Monitor autoloaded options and clean up if needed.",
        ));
    }
}
