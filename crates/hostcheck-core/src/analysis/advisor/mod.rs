pub mod recommendations;

use std::collections::HashMap;

use serde::Serialize;

use super::{Finding, FindingKind};
use crate::value::Value;
use recommendations::{
    CONFIG_TEXTS, EXTENSION_TEXTS, PATCHABLE_DIRECTIVES, VERSION_TEXTS, generic_text,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct Recommendation {
    pub text: String,
    /// `.htaccess` override line, for allow-listed configuration directives only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// Maps findings to remediation text and an optional config patch.
pub struct RecommendationResolver {
    texts: HashMap<(FindingKind, &'static str), &'static str>,
}

impl Default for RecommendationResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationResolver {
    pub fn new() -> Self {
        let tables = [
            (FindingKind::Version, VERSION_TEXTS),
            (FindingKind::Configuration, CONFIG_TEXTS),
            (FindingKind::Extension, EXTENSION_TEXTS),
        ];
        let texts = tables
            .into_iter()
            .flat_map(|(kind, table)| {
                table
                    .iter()
                    .map(move |(label, text)| ((kind, *label), *text))
            })
            .collect();
        Self { texts }
    }

    /// Exact (kind, label) lookup, falling back to the per-kind generic text.
    pub fn recommend(&self, finding: &Finding) -> Recommendation {
        let text = self
            .texts
            .get(&(finding.kind, finding.label.as_str()))
            .copied()
            .unwrap_or_else(|| generic_text(finding.kind));
        Recommendation {
            text: text.to_string(),
            patch: config_patch(finding),
        }
    }
}

/// Builds `php_value key VALUE` or `php_flag key On` for allow-listed directives.
///
/// Returns `None` for non-config findings, unknown directives, or when there is
/// no recommended target that survives sanitization.
pub fn config_patch(finding: &Finding) -> Option<String> {
    if finding.kind != FindingKind::Configuration {
        return None;
    }
    let key = PATCHABLE_DIRECTIVES
        .iter()
        .find(|k| **k == finding.key)?;
    let target = &finding.baseline.as_ref()?.recommended;

    match target {
        Value::Bool(b) => Some(format!("php_flag {key} {}", if *b { "On" } else { "Off" })),
        Value::Numeric(n) => Some(format!("php_value {key} {}", sanitize(&n.to_string())?)),
        Value::Str(s) => Some(format!("php_value {key} {}", sanitize(s)?)),
        Value::NotAvailable => None,
    }
}

fn sanitize(raw: &str) -> Option<String> {
    let clean: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    (!clean.is_empty()).then_some(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify::Comparison;
    use crate::analysis::Severity;
    use crate::catalog::{Requirement, RequirementCatalog};

    fn config_finding(key: &str, current: &str) -> Finding {
        let catalog = RequirementCatalog::default();
        let req = catalog.config.iter().find(|r| r.key == key).unwrap();
        Finding::classified(
            FindingKind::Configuration,
            req,
            Comparison::for_config(&req.required),
            Value::from(current),
        )
    }

    #[test]
    fn test_exact_text_and_patch() {
        let r = RecommendationResolver::new().recommend(&config_finding("memory_limit", "64M"));
        assert!(r.text.starts_with("Increase PHP memory limit"));
        assert_eq!(r.patch.as_deref(), Some("php_value memory_limit 512M"));
    }

    #[test]
    fn test_flag_patch() {
        let f = config_finding("file_uploads", "Off");
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(config_patch(&f).as_deref(), Some("php_flag file_uploads On"));
    }

    #[test]
    fn test_numeric_patch() {
        let f = config_finding("max_input_vars", "1000");
        assert_eq!(config_patch(&f).as_deref(), Some("php_value max_input_vars 3000"));
    }

    #[test]
    fn test_target_is_sanitized() {
        let req = Requirement {
            key: "memory_limit".to_string(),
            label: "memory_limit".to_string(),
            required: Value::from("128M"),
            recommended: Value::from("512M\nphp_value auto_prepend_file /tmp/x"),
            shortfall: None,
            unlimited: None,
        };
        let f = Finding::classified(
            FindingKind::Configuration,
            &req,
            Comparison::Magnitude,
            Value::from("64M"),
        );
        let patch = config_patch(&f).unwrap();
        assert!(!patch.contains('\n'));
        assert!(!patch.contains('/'));
        assert!(patch.starts_with("php_value memory_limit 512M"));
    }

    #[test]
    fn test_no_patch_for_versions_or_extensions() {
        let catalog = RequirementCatalog::default();
        let resolver = RecommendationResolver::new();

        let php = Finding::classified(
            FindingKind::Version,
            &catalog.versions[0],
            Comparison::Version,
            Value::from("7.0"),
        );
        let r = resolver.recommend(&php);
        assert!(r.text.starts_with("Update PHP"));
        assert_eq!(r.patch, None);

        let curl = Finding::classified(
            FindingKind::Extension,
            &catalog.extensions[0],
            Comparison::Flag,
            Value::Bool(false),
        );
        let r = resolver.recommend(&curl);
        assert!(r.text.starts_with("Install php-curl"));
        assert_eq!(r.patch, None);
    }

    #[test]
    fn test_unknown_labels_fall_back_per_kind() {
        let resolver = RecommendationResolver::new();
        let cases = [
            (FindingKind::Version, "Contact your hosting provider or system administrator"),
            (FindingKind::Configuration, "Modify your php.ini file"),
            (FindingKind::Extension, "Install this PHP extension"),
        ];
        for (kind, prefix) in cases {
            let f = Finding::info(kind, "zz", "Unknown Thing", Value::from("x"));
            let r = resolver.recommend(&f);
            assert!(r.text.starts_with(prefix), "{kind:?}");
            assert_eq!(r.patch, None);
        }
    }

    #[test]
    fn test_directive_outside_allow_list_has_no_patch() {
        let req = Requirement {
            key: "display_errors".to_string(),
            label: "display_errors".to_string(),
            required: Value::Bool(false),
            recommended: Value::Bool(false),
            shortfall: None,
            unlimited: None,
        };
        let f = Finding::classified(FindingKind::Configuration, &req, Comparison::Flag, Value::Bool(true));
        assert_eq!(config_patch(&f), None);
    }
}
