use serde::{Serialize, Serializer};

use crate::slowlog::SlowQueryPattern;
use crate::value::NOT_AVAILABLE;

/// Marker emitted for every metric while live monitoring is switched off.
pub const DISABLED: &str = "Disabled";

pub const DISABLED_WARNING: &str =
    "Live database monitoring is disabled. Enable it in the live monitor settings to collect metrics.";

/// One live metric: a number, or a marker explaining why there is none.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub enum Metric {
    Value(f64),
    NotAvailable,
    Disabled,
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Metric::NotAvailable, Metric::Value)
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
            Metric::Disabled => serializer.serialize_str(DISABLED),
        }
    }
}

/// Result of one sampling cycle. Replaced wholesale by the next cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct LiveMetricsSnapshot {
    pub response_ms: Metric,
    pub autoload_mb: Metric,
    pub db_size_mb: Metric,
    pub revision_count: Metric,
    pub threads_connected: Metric,
    pub slow_query_count: Metric,
    pub warnings: Vec<String>,
    pub slow_query_patterns: Vec<SlowQueryPattern>,
    /// Wall clock, milliseconds since the Unix epoch.
    pub sampled_at: i64,
    /// Milliseconds since the sampler was created.
    pub monotonic_ms: u64,
}

impl LiveMetricsSnapshot {
    /// Snapshot returned while monitoring is disabled. No probe is involved.
    pub fn disabled(sampled_at: i64, monotonic_ms: u64) -> Self {
        Self {
            response_ms: Metric::Disabled,
            autoload_mb: Metric::Disabled,
            db_size_mb: Metric::Disabled,
            revision_count: Metric::Disabled,
            threads_connected: Metric::Disabled,
            slow_query_count: Metric::Disabled,
            warnings: vec![DISABLED_WARNING.to_string()],
            slow_query_patterns: Vec::new(),
            sampled_at,
            monotonic_ms,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.response_ms == Metric::Disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_serialization() {
        assert_eq!(serde_json::to_string(&Metric::Value(1.25)).unwrap(), "1.25");
        assert_eq!(
            serde_json::to_string(&Metric::NotAvailable).unwrap(),
            "\"Not available\""
        );
        assert_eq!(serde_json::to_string(&Metric::Disabled).unwrap(), "\"Disabled\"");
    }

    #[test]
    fn test_disabled_snapshot_marks_every_metric() {
        let snap = LiveMetricsSnapshot::disabled(1_700_000_000_000, 0);
        let json = serde_json::to_value(&snap).unwrap();
        for field in [
            "response_ms",
            "autoload_mb",
            "db_size_mb",
            "revision_count",
            "threads_connected",
            "slow_query_count",
        ] {
            assert_eq!(json[field], "Disabled", "{field}");
        }
        assert_eq!(snap.warnings.len(), 1);
        assert!(snap.is_disabled());
    }
}
