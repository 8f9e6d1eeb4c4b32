use crate::analysis::classify::Comparison;
use crate::analysis::{EvaluationContext, Finding, FindingKind};

use super::Checklist;

/// Runtime configuration directives. Boolean baselines compare as flags,
/// everything else as magnitudes.
pub struct ConfigChecklist;

impl Checklist for ConfigChecklist {
    fn kind(&self) -> FindingKind {
        FindingKind::Configuration
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        ctx.catalog
            .config
            .iter()
            .map(|req| {
                let current = ctx.value_or_unavailable(&req.key, ctx.probe.config_value(&req.key));
                let comparison = Comparison::for_config(&req.required);
                Finding::classified(FindingKind::Configuration, req, comparison, current)
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
    use crate::value::Value;

    fn find(probe: &MockProbe, key: &str) -> Finding {
        let catalog = RequirementCatalog::default();
        let ctx = EvaluationContext {
            probe,
            catalog: &catalog,
        };
        ConfigChecklist
            .evaluate(&ctx)
            .into_iter()
            .find(|f| f.key == key)
            .unwrap()
    }

    #[test]
    fn test_memory_limit_tiers() {
        let base = MockProbe::typical_host();
        let cases = [
            ("64M", Severity::Critical),
            ("128M", Severity::Warning),
            ("256M", Severity::Warning),
            ("512M", Severity::Ok),
            ("1G", Severity::Ok),
            ("-1", Severity::Ok),
        ];
        for (limit, expected) in cases {
            let probe = base.clone().with_config("memory_limit", limit);
            assert_eq!(find(&probe, "memory_limit").severity, expected, "{limit}");
        }
    }

    #[test]
    fn test_unlimited_execution_time_is_ok() {
        let probe = MockProbe::typical_host().with_config("max_execution_time", "0");
        assert_eq!(find(&probe, "max_execution_time").severity, Severity::Ok);
        let probe = MockProbe::typical_host().with_config("max_execution_time", 10_i64);
        assert_eq!(find(&probe, "max_execution_time").severity, Severity::Critical);
    }

    #[test]
    fn test_file_uploads_off_is_critical() {
        let probe = MockProbe::typical_host().with_config("file_uploads", "Off");
        assert_eq!(find(&probe, "file_uploads").severity, Severity::Critical);
    }

    #[test]
    fn test_unparsable_value_is_info() {
        let probe = MockProbe::typical_host().with_config("post_max_size", "lots");
        let f = find(&probe, "post_max_size");
        assert_eq!(f.severity, Severity::Info);
        assert_eq!(f.current, Value::from("lots"));
    }

    #[test]
    fn test_missing_directive_is_not_available() {
        let f = find(&MockProbe::new(), "max_input_vars");
        assert_eq!(f.current, Value::NotAvailable);
        assert_eq!(f.severity, Severity::Info);
    }
}
