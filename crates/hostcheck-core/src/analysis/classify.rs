//! Threshold classification: `(required, recommended, current) -> Severity`.
//!
//! All comparisons check the Critical boundary (`current < required`) first and
//! the OK boundary (`current >= recommended`) second. When a catalog entry has
//! `required > recommended` this ordering means nothing between the two is ever
//! reported as Warning, and classification stays monotonic in `current`.

use std::cmp::Ordering;

use serde::Serialize;

use super::Severity;
use crate::value::{Value, compare_versions};

/// How a requirement's values are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Dotted numeric versions.
    Version,
    /// Boolean presence (extension loaded, directive enabled).
    Flag,
    /// Integers and 1024-based size directives.
    Magnitude,
}

impl Comparison {
    /// Config directives are flags when the baseline is boolean, magnitudes otherwise.
    pub fn for_config(required: &Value) -> Self {
        match required {
            Value::Bool(_) => Comparison::Flag,
            _ => Comparison::Magnitude,
        }
    }

    /// Whether `required` is stricter than `recommended` (a catalog data error).
    pub fn exceeds(self, required: &Value, recommended: &Value) -> bool {
        match self {
            Comparison::Version => match (required.as_version(), recommended.as_version()) {
                (Some(a), Some(b)) => compare_versions(&a, &b) == Ordering::Greater,
                _ => false,
            },
            Comparison::Flag => {
                required.as_bool() == Some(true) && recommended.as_bool() == Some(false)
            }
            Comparison::Magnitude => match (required.magnitude(), recommended.magnitude()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
        }
    }
}

/// Three-tier rule over magnitudes (bytes, seconds, counts).
pub fn classify_magnitude(current: i64, required: i64, recommended: i64) -> Severity {
    if current < required {
        Severity::Critical
    } else if current >= recommended {
        Severity::Ok
    } else {
        Severity::Warning
    }
}

/// Three-tier rule over parsed versions.
pub fn classify_version(current: &[u64], required: &[u64], recommended: &[u64]) -> Severity {
    if compare_versions(current, required) == Ordering::Less {
        Severity::Critical
    } else if compare_versions(current, recommended) != Ordering::Less {
        Severity::Ok
    } else {
        Severity::Warning
    }
}

/// Boolean rule: Critical only when a required flag is off.
///
/// A flag that is off while recommended (but not required) is OK unless the
/// requirement supplies an explicit `shortfall` severity.
pub fn classify_flag(
    current: bool,
    required: bool,
    recommended: bool,
    shortfall: Option<Severity>,
) -> Severity {
    if required && !current {
        return Severity::Critical;
    }
    if recommended
        && !current
        && let Some(severity) = shortfall
    {
        return severity;
    }
    Severity::Ok
}

/// Classifies `current` against a baseline.
///
/// Returns [`Severity::Info`] when `current` is unavailable or cannot be
/// interpreted under `comparison`; never panics on malformed input.
pub fn classify(
    comparison: Comparison,
    current: &Value,
    required: &Value,
    recommended: &Value,
    shortfall: Option<Severity>,
    unlimited: Option<i64>,
) -> Severity {
    match comparison {
        Comparison::Version => {
            match (current.as_version(), required.as_version(), recommended.as_version()) {
                (Some(c), Some(req), Some(rec)) => classify_version(&c, &req, &rec),
                _ => Severity::Info,
            }
        }
        Comparison::Flag => match (current.as_bool(), required.as_bool(), recommended.as_bool()) {
            (Some(c), Some(req), Some(rec)) => classify_flag(c, req, rec, shortfall),
            _ => Severity::Info,
        },
        Comparison::Magnitude => {
            match (current.magnitude(), required.magnitude(), recommended.magnitude()) {
                (Some(c), Some(req), Some(rec)) => {
                    let c = if unlimited == Some(c) { i64::MAX } else { c };
                    classify_magnitude(c, req, rec)
                }
                _ => Severity::Info,
            }
        }
    }
}
