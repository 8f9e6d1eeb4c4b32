use crate::analysis::classify::Comparison;
use crate::analysis::{EvaluationContext, Finding, FindingKind};
use crate::value::Value;

use super::Checklist;

/// Extension presence. Current is `true` when loaded.
pub struct ExtensionChecklist;

impl Checklist for ExtensionChecklist {
    fn kind(&self) -> FindingKind {
        FindingKind::Extension
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        ctx.catalog
            .extensions
            .iter()
            .map(|req| {
                let current = ctx.value_or_unavailable(
                    &req.key,
                    ctx.probe.has_extension(&req.key).map(Value::Bool),
                );
                Finding::classified(FindingKind::Extension, req, Comparison::Flag, current)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Severity;
    use crate::catalog::RequirementCatalog;
    use crate::collector::mock::MockProbe;

    fn run(probe: &MockProbe) -> Vec<Finding> {
        let catalog = RequirementCatalog::default();
        let ctx = EvaluationContext {
            probe,
            catalog: &catalog,
        };
        ExtensionChecklist.evaluate(&ctx)
    }

    fn severity_of(findings: &[Finding], key: &str) -> Severity {
        findings.iter().find(|f| f.key == key).unwrap().severity
    }

    #[test]
    fn test_missing_required_is_critical_missing_optional_is_warning() {
        let findings = run(&MockProbe::legacy_host());
        assert_eq!(severity_of(&findings, "curl"), Severity::Critical);
        assert_eq!(severity_of(&findings, "exif"), Severity::Warning);
        assert_eq!(severity_of(&findings, "gd"), Severity::Ok);
    }

    #[test]
    fn test_restricted_probe_is_info() {
        let findings = run(&MockProbe::typical_host().restrict("curl"));
        let curl = findings.iter().find(|f| f.key == "curl").unwrap();
        assert_eq!(curl.severity, Severity::Info);
        assert_eq!(curl.current, Value::NotAvailable);
    }

    #[test]
    fn test_one_finding_per_catalog_entry() {
        let findings = run(&MockProbe::typical_host());
        assert_eq!(findings.len(), RequirementCatalog::default().extensions.len());
        assert!(findings.iter().all(|f| f.severity == Severity::Ok));
    }
}
