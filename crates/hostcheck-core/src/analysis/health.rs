//! Overall verdict over a finding list.

use serde::Serialize;

use super::{Finding, FindingKind, Severity};
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Success,
    Warning,
    Error,
}

/// A warning or critical finding surfaced in the summary.
///
/// Critical details carry the `required` bound that was missed, warnings the
/// `recommended` target.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct HealthDetail {
    pub kind: FindingKind,
    pub key: String,
    pub label: String,
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended: Option<Value>,
    pub severity: Severity,
}

impl From<&Finding> for HealthDetail {
    fn from(f: &Finding) -> Self {
        let critical = f.severity == Severity::Critical;
        let baseline = f.baseline.as_ref();
        Self {
            kind: f.kind,
            key: f.key.clone(),
            label: f.label.clone(),
            current: f.current.clone(),
            required: baseline.filter(|_| critical).map(|b| b.required.clone()),
            recommended: baseline.filter(|_| !critical).map(|b| b.recommended.clone()),
            severity: f.severity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct HealthSummary {
    pub status: HealthStatus,
    pub critical_count: usize,
    pub warning_count: usize,
    /// Critical plus warning; informational rows are not counted.
    pub total_count: usize,
    pub message: String,
    /// Critical findings first, then warnings, each in evaluation order.
    pub details: Vec<HealthDetail>,
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn message(critical: usize, warnings: usize) -> String {
    if critical > 0 {
        let mut msg = plural(
            critical,
            "critical issue found that needs immediate attention",
            "critical issues found that need immediate attention",
        );
        if warnings > 0 {
            msg.push_str(" and ");
            msg.push_str(&plural(warnings, "warning", "warnings"));
        }
        msg
    } else if warnings > 0 {
        format!(
            "{} found - consider optimization for better performance",
            plural(warnings, "warning", "warnings")
        )
    } else {
        "All systems are running optimally! Your installation meets all requirements.".to_string()
    }
}

/// Reduces findings to a status, counts and a summary message.
pub fn aggregate(findings: &[Finding]) -> HealthSummary {
    let critical: Vec<HealthDetail> = findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .map(HealthDetail::from)
        .collect();
    let warnings: Vec<HealthDetail> = findings
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .map(HealthDetail::from)
        .collect();

    let critical_count = critical.len();
    let warning_count = warnings.len();
    let status = if critical_count > 0 {
        HealthStatus::Error
    } else if warning_count > 0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Success
    };

    let mut details = critical;
    details.extend(warnings);

    HealthSummary {
        status,
        critical_count,
        warning_count,
        total_count: critical_count + warning_count,
        message: message(critical_count, warning_count),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Baseline;
    use crate::analysis::classify::Comparison;

    fn finding(label: &str, severity: Severity) -> Finding {
        let mut f = Finding::info(FindingKind::Configuration, label, label, Value::from("x"));
        f.severity = severity;
        f
    }

    #[test]
    fn test_critical_first_regardless_of_input_order() {
        let findings = vec![
            finding("w1", Severity::Warning),
            finding("ok", Severity::Ok),
            finding("c1", Severity::Critical),
            finding("w2", Severity::Warning),
            finding("info", Severity::Info),
            finding("c2", Severity::Critical),
        ];
        let summary = aggregate(&findings);
        let labels: Vec<&str> = summary.details.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["c1", "c2", "w1", "w2"]);
        assert_eq!(summary.status, HealthStatus::Error);
        assert_eq!(summary.total_count, 4);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            message(1, 0),
            "1 critical issue found that needs immediate attention"
        );
        assert_eq!(
            message(4, 2),
            "4 critical issues found that need immediate attention and 2 warnings"
        );
        assert_eq!(
            message(2, 1),
            "2 critical issues found that need immediate attention and 1 warning"
        );
        assert_eq!(
            message(0, 1),
            "1 warning found - consider optimization for better performance"
        );
        assert_eq!(
            message(0, 3),
            "3 warnings found - consider optimization for better performance"
        );
        assert!(message(0, 0).starts_with("All systems are running optimally"));
    }

    #[test]
    fn test_info_and_ok_are_not_counted() {
        let summary = aggregate(&[finding("a", Severity::Info), finding("b", Severity::Ok)]);
        assert_eq!(summary.status, HealthStatus::Success);
        assert_eq!(summary.total_count, 0);
        assert!(summary.details.is_empty());
    }

    #[test]
    fn test_warnings_only() {
        let summary = aggregate(&[finding("a", Severity::Warning)]);
        assert_eq!(summary.status, HealthStatus::Warning);
        assert_eq!(summary.critical_count, 0);
        assert_eq!(summary.warning_count, 1);
    }

    #[test]
    fn test_critical_details_carry_required_bound() {
        let baseline = Baseline {
            comparison: Comparison::Magnitude,
            required: Value::from("128M"),
            recommended: Value::from("256M"),
            shortfall: None,
            unlimited: None,
        };
        let mut low = finding("memory_limit", Severity::Critical);
        low.baseline = Some(baseline.clone());
        let mut mid = finding("post_max_size", Severity::Warning);
        mid.baseline = Some(baseline);

        let summary = aggregate(&[mid, low]);
        let critical = &summary.details[0];
        assert_eq!(critical.required, Some(Value::from("128M")));
        assert_eq!(critical.recommended, None);
        let warning = &summary.details[1];
        assert_eq!(warning.required, None);
        assert_eq!(warning.recommended, Some(Value::from("256M")));

        let json = serde_json::to_value(critical).unwrap();
        assert_eq!(json["required"], serde_json::to_value(Value::from("128M")).unwrap());
        assert!(json.get("recommended").is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Error).unwrap(), "\"error\"");
    }
}
