//! Requirement and probe values.
//!
//! A [`Value`] is what the catalog stores as a baseline and what a probe
//! reports as the current state. Size-like configuration values (`"128M"`)
//! are kept in their textual form and converted to bytes only when compared,
//! so findings can show exactly what the host reported.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Display text for a value the probe could not supply.
pub const NOT_AVAILABLE: &str = "Not available";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Numeric(i64),
    Str(String),
    /// The probe failed or the value is restricted by host policy.
    NotAvailable,
}

impl Value {
    /// Magnitude for numeric comparison: integers as-is, size strings in bytes.
    pub fn magnitude(&self) -> Option<i64> {
        match self {
            Value::Numeric(n) => Some(*n),
            Value::Str(s) => to_bytes(s),
            Value::Bool(_) | Value::NotAvailable => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Numeric(n) => Some(*n != 0),
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "on" | "yes" | "true" => Some(true),
                "" | "0" | "off" | "no" | "false" => Some(false),
                _ => None,
            },
            Value::NotAvailable => None,
        }
    }

    pub fn as_version(&self) -> Option<Vec<u64>> {
        match self {
            Value::Str(s) => parse_version(s),
            Value::Numeric(n) => u64::try_from(*n).ok().map(|n| vec![n]),
            Value::Bool(_) | Value::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Value::NotAvailable)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Numeric(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => f.write_str("Yes"),
            Value::Bool(false) => f.write_str("No"),
            Value::Numeric(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Numeric(n) => serializer.serialize_i64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

// ============================================================
// Size parsing
// ============================================================

/// Convert a size directive (`"128M"`, `"2G"`, `"1000"`) to bytes.
///
/// Suffixes are 1024-based and case-insensitive. A value without a suffix is
/// taken as a plain integer. Returns `None` when there is no leading integer.
pub fn to_bytes(value: &str) -> Option<i64> {
    let value = value.trim();
    let digits_end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    let number: i64 = value[..digits_end].parse().ok()?;

    let multiplier: i64 = match value.chars().last().map(|c| c.to_ascii_lowercase()) {
        Some('g') => 1024 * 1024 * 1024,
        Some('m') => 1024 * 1024,
        Some('k') => 1024,
        _ => 1,
    };
    Some(number.saturating_mul(multiplier))
}

// ============================================================
// Version parsing
// ============================================================

/// Extract the numeric dotted prefix of a version string.
///
/// `"8.0.36-0ubuntu0.22.04.1"` → `[8, 0, 36]`, `"10.6.12-MariaDB"` → `[10, 6, 12]`,
/// `"v8.1"` → `[8, 1]`. Returns `None` if the string contains no digits.
pub fn parse_version(raw: &str) -> Option<Vec<u64>> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let rest = &raw[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());

    let segments: Vec<u64> = rest[..end]
        .split('.')
        .take_while(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

/// Compare two parsed versions segment by segment; missing segments count as 0.
pub fn compare_versions(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes_suffixes() {
        assert_eq!(to_bytes("128M"), Some(134_217_728));
        assert_eq!(to_bytes("512m"), Some(536_870_912));
        assert_eq!(to_bytes("2G"), Some(2_147_483_648));
        assert_eq!(to_bytes("64K"), Some(65_536));
        assert_eq!(to_bytes(" 1000 "), Some(1000));
        assert_eq!(to_bytes("-1"), Some(-1));
    }

    #[test]
    fn test_to_bytes_rejects_garbage() {
        assert_eq!(to_bytes(""), None);
        assert_eq!(to_bytes("M"), None);
        assert_eq!(to_bytes("unlimited"), None);
    }

    #[test]
    fn test_parse_version_ignores_suffixes() {
        assert_eq!(parse_version("8.0.36-0ubuntu0.22.04.1"), Some(vec![8, 0, 36]));
        assert_eq!(parse_version("10.6.12-MariaDB-log"), Some(vec![10, 6, 12]));
        assert_eq!(parse_version("v8.1"), Some(vec![8, 1]));
        assert_eq!(parse_version("7.4"), Some(vec![7, 4]));
        assert_eq!(parse_version("unknown"), None);
    }

    #[test]
    fn test_compare_versions_pads_missing_segments() {
        assert_eq!(compare_versions(&[7, 4], &[7, 4, 0]), Ordering::Equal);
        assert_eq!(compare_versions(&[8, 10], &[8, 9]), Ordering::Greater);
        assert_eq!(compare_versions(&[5, 7, 44], &[8, 0]), Ordering::Less);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(Value::Bool(true).to_string(), "Yes");
        assert_eq!(Value::NotAvailable.to_string(), "Not available");
        assert_eq!(
            serde_json::to_string(&Value::NotAvailable).unwrap(),
            "\"Not available\""
        );
        assert_eq!(serde_json::to_string(&Value::from("256M")).unwrap(), "\"256M\"");
    }

    #[test]
    fn test_as_bool_parses_ini_flags() {
        assert_eq!(Value::from("On").as_bool(), Some(true));
        assert_eq!(Value::from("0").as_bool(), Some(false));
        assert_eq!(Value::from("maybe").as_bool(), None);
    }
}
