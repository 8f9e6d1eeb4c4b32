//! Shared formatting helpers for report rows and live metrics.
//!
//! All values are rounded to at most two decimals and printed without
//! trailing zeros (`1.5 GB`, not `1.50 GB`).

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Round to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Print a number with at most two decimals and no trailing zeros.
///
/// `1.0` → `"1"`, `1.5` → `"1.5"`, `1.234` → `"1.23"`
pub fn format_decimal(v: f64) -> String {
    let s = format!("{:.2}", round2(v));
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Format byte count as human-readable size with 1024-based units.
///
/// `"512 B"`, `"1.5 KB"`, `"100.25 MB"`, `"16 GB"`
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", format_decimal(value), UNITS[unit])
}

/// Bytes to megabytes, rounded to two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / (1024.0 * 1024.0))
}

/// Percentage of `part` in `total` with one decimal, e.g. `"37.5%"`.
///
/// Returns `None` when `total` is zero.
pub fn format_percent(part: u64, total: u64) -> Option<String> {
    if total == 0 {
        return None;
    }
    let pct = part as f64 / total as f64 * 100.0;
    Some(format!("{:.1}%", pct))
}

/// Format 1/5/15 minute load averages as `"0.42, 0.35, 0.3"`.
pub fn format_load_average(load: &[f64; 3]) -> String {
    load.iter()
        .map(|l| format_decimal(*l))
        .collect::<Vec<_>>()
        .join(", ")
}
