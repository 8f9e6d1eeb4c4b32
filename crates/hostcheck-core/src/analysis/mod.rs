pub mod advisor;
pub mod classify;
pub mod health;
pub mod host_info;
pub mod performance;
pub mod resources;
pub mod rules;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Requirement, RequirementCatalog};
use crate::collector::traits::{EnvironmentProbe, LiveMetricsSource, ProbeError};
use crate::live::settings::LiveDbSettings;
use crate::value::Value;
use advisor::{Recommendation, RecommendationResolver};
use classify::Comparison;
use health::HealthSummary;
use host_info::InfoRow;
use performance::{PerformanceFacts, PerformanceIssue};
use resources::ResourceRow;

// ============================================================
// Core types
// ============================================================

/// Ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational row, never counted.
    Info,
    Ok,
    Warning,
    Critical,
}

/// Which checklist produced a finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub enum FindingKind {
    Version,
    Extension,
    Configuration,
}

/// The thresholds a finding was classified against.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct Baseline {
    pub comparison: Comparison,
    pub required: Value,
    pub recommended: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<i64>,
}

impl Baseline {
    pub fn from_requirement(req: &Requirement, comparison: Comparison) -> Self {
        Self {
            comparison,
            required: req.required.clone(),
            recommended: req.recommended.clone(),
            shortfall: req.shortfall,
            unlimited: req.unlimited,
        }
    }

    pub fn classify(&self, current: &Value) -> Severity {
        classify::classify(
            self.comparison,
            current,
            &self.required,
            &self.recommended,
            self.shortfall,
            self.unlimited,
        )
    }
}

/// One evaluated row of the report.
///
/// Built fresh on every evaluation. `severity` is always what
/// `baseline.classify(current)` returns, or Info without a baseline.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct Finding {
    pub kind: FindingKind,
    pub key: String,
    pub label: String,
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Baseline>,
    pub severity: Severity,
}

impl Finding {
    pub fn classified(
        kind: FindingKind,
        req: &Requirement,
        comparison: Comparison,
        current: Value,
    ) -> Self {
        let baseline = Baseline::from_requirement(req, comparison);
        let severity = baseline.classify(&current);
        Self {
            kind,
            key: req.key.clone(),
            label: req.label.clone(),
            current,
            baseline: Some(baseline),
            severity,
        }
    }

    /// Informational row without a baseline.
    pub fn info(kind: FindingKind, key: &str, label: &str, current: Value) -> Self {
        Self {
            kind,
            key: key.to_string(),
            label: label.to_string(),
            current,
            baseline: None,
            severity: Severity::Info,
        }
    }

    /// Recomputes severity from the stored baseline and current value.
    pub fn reclassify(&self) -> Severity {
        self.baseline
            .as_ref()
            .map_or(Severity::Info, |b| b.classify(&self.current))
    }

    pub fn is_issue(&self) -> bool {
        matches!(self.severity, Severity::Warning | Severity::Critical)
    }
}

// ============================================================
// Evaluation context passed to each checklist
// ============================================================

pub struct EvaluationContext<'a> {
    pub probe: &'a dyn EnvironmentProbe,
    pub catalog: &'a RequirementCatalog,
}

impl EvaluationContext<'_> {
    /// Converts a probe result into a value, logging why it is unavailable.
    pub fn value_or_unavailable(&self, key: &str, result: Result<Value, ProbeError>) -> Value {
        match result {
            Ok(v) => v,
            Err(e) => {
                debug!(key, error = %e, "probe value unavailable");
                Value::NotAvailable
            }
        }
    }
}

// ============================================================
// Evaluator
// ============================================================

/// Walks every tracked requirement and classifies the probe's current values.
pub struct DiagnosticEvaluator {
    catalog: Arc<RequirementCatalog>,
    probe: Arc<dyn EnvironmentProbe>,
    checklists: Vec<Box<dyn rules::Checklist>>,
}

impl DiagnosticEvaluator {
    pub fn new(catalog: Arc<RequirementCatalog>, probe: Arc<dyn EnvironmentProbe>) -> Self {
        Self {
            catalog,
            probe,
            checklists: rules::all_checklists(),
        }
    }

    pub fn catalog(&self) -> &RequirementCatalog {
        &self.catalog
    }

    pub fn probe(&self) -> &dyn EnvironmentProbe {
        self.probe.as_ref()
    }

    /// Findings for every checklist, in order: versions, extensions, configuration.
    pub fn evaluate(&self) -> Vec<Finding> {
        let ctx = self.context();
        self.checklists
            .iter()
            .flat_map(|c| c.evaluate(&ctx))
            .collect()
    }

    /// Findings for one checklist only.
    pub fn evaluate_kind(&self, kind: FindingKind) -> Vec<Finding> {
        let ctx = self.context();
        self.checklists
            .iter()
            .filter(|c| c.kind() == kind)
            .flat_map(|c| c.evaluate(&ctx))
            .collect()
    }

    /// Informational rows from the probe's OS resource counters.
    pub fn resource_rows(&self) -> Vec<ResourceRow> {
        resources::resource_rows(&self.probe.resource_counters())
    }

    fn context(&self) -> EvaluationContext<'_> {
        EvaluationContext {
            probe: self.probe.as_ref(),
            catalog: &self.catalog,
        }
    }
}

// ============================================================
// Report
// ============================================================

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct ReportEntry {
    #[serde(flatten)]
    pub finding: Finding,
    /// Present for warning and critical findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
}

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct DiagnosticReport {
    /// Unix seconds.
    pub generated_at: i64,
    pub summary: HealthSummary,
    pub findings: Vec<ReportEntry>,
    pub resources: Vec<ResourceRow>,
    /// Server, site, hosting and security information.
    pub host_info: Vec<InfoRow>,
    pub performance: Vec<PerformanceIssue>,
}

/// Runs the evaluator, health aggregation, recommendations and performance heuristics.
pub struct Analyzer {
    evaluator: DiagnosticEvaluator,
    resolver: RecommendationResolver,
}

impl Analyzer {
    pub fn new(evaluator: DiagnosticEvaluator) -> Self {
        Self {
            evaluator,
            resolver: RecommendationResolver::new(),
        }
    }

    pub fn evaluator(&self) -> &DiagnosticEvaluator {
        &self.evaluator
    }

    /// Builds a full report. `live` feeds the performance heuristics when present.
    pub fn analyze(
        &self,
        live: Option<&mut dyn LiveMetricsSource>,
        settings: &LiveDbSettings,
    ) -> DiagnosticReport {
        let findings = self.evaluator.evaluate();
        let summary = health::aggregate(&findings);

        let facts = PerformanceFacts::gather(self.evaluator.probe(), live, settings);
        let performance = performance::diagnose(&facts);
        let host_info = host_info::host_info_rows(self.evaluator.probe(), facts.response_ms);

        let findings = findings
            .into_iter()
            .map(|finding| {
                let recommendation = finding
                    .is_issue()
                    .then(|| self.resolver.recommend(&finding));
                ReportEntry {
                    finding,
                    recommendation,
                }
            })
            .collect();

        DiagnosticReport {
            generated_at: chrono::Utc::now().timestamp(),
            summary,
            findings,
            resources: self.evaluator.resource_rows(),
            host_info,
            performance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockLiveSource, MockProbe};

    fn evaluator(probe: MockProbe) -> DiagnosticEvaluator {
        DiagnosticEvaluator::new(Arc::new(RequirementCatalog::default()), Arc::new(probe))
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Ok);
        assert!(Severity::Ok > Severity::Info);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let ev = evaluator(MockProbe::legacy_host());
        let a = ev.evaluate();
        let b = ev.evaluate();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(health::aggregate(&a), health::aggregate(&b));
    }

    #[test]
    fn test_severity_is_reproducible_from_baseline() {
        let ev = evaluator(MockProbe::legacy_host());
        for f in ev.evaluate() {
            assert_eq!(f.reclassify(), f.severity, "{}", f.label);
        }
    }

    #[test]
    fn test_checklists_run_in_order() {
        let kinds: Vec<FindingKind> = evaluator(MockProbe::typical_host())
            .evaluate()
            .iter()
            .map(|f| f.kind)
            .collect();
        let first_ext = kinds.iter().position(|k| *k == FindingKind::Extension).unwrap();
        let first_cfg = kinds
            .iter()
            .position(|k| *k == FindingKind::Configuration)
            .unwrap();
        assert!(kinds[..first_ext].iter().all(|k| *k == FindingKind::Version));
        assert!(kinds[first_ext..first_cfg].iter().all(|k| *k == FindingKind::Extension));
        assert!(kinds[first_cfg..].iter().all(|k| *k == FindingKind::Configuration));
    }

    #[test]
    fn test_typical_host_has_no_issues() {
        let findings = evaluator(MockProbe::typical_host()).evaluate();
        let issues: Vec<_> = findings.iter().filter(|f| f.is_issue()).collect();
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_empty_probe_yields_info_rows_not_errors() {
        let findings = evaluator(MockProbe::new()).evaluate();
        for f in &findings {
            match f.kind {
                // an absent extension is "not loaded", not unavailable
                FindingKind::Extension => assert_ne!(f.severity, Severity::Info),
                _ => {
                    assert_eq!(f.severity, Severity::Info, "{}", f.label);
                    assert!(!f.current.is_available() || f.baseline.is_none());
                }
            }
        }
    }

    #[test]
    fn test_evaluate_kind_filters() {
        let ev = evaluator(MockProbe::typical_host());
        let cfg = ev.evaluate_kind(FindingKind::Configuration);
        assert_eq!(cfg.len(), ev.catalog().config.len());
        assert!(cfg.iter().all(|f| f.kind == FindingKind::Configuration));
    }

    #[test]
    fn test_report_attaches_recommendations_to_issues_only() {
        let analyzer = Analyzer::new(evaluator(MockProbe::legacy_host()));
        let mut live = MockLiveSource::healthy();
        let report = analyzer.analyze(Some(&mut live), &LiveDbSettings::default());

        assert_eq!(report.summary.critical_count, 4);
        assert_eq!(report.summary.warning_count, 2);
        for entry in &report.findings {
            assert_eq!(entry.recommendation.is_some(), entry.finding.is_issue());
        }
        let memory = report
            .findings
            .iter()
            .find(|e| e.finding.key == "memory_limit")
            .unwrap();
        assert_eq!(
            memory.recommendation.as_ref().unwrap().patch.as_deref(),
            Some("php_value memory_limit 512M")
        );
        assert!(!report.performance.is_empty());
    }

    #[test]
    fn test_report_serializes_flat_entries() {
        let analyzer = Analyzer::new(evaluator(MockProbe::legacy_host()));
        let report = analyzer.analyze(None, &LiveDbSettings::default());
        let json = serde_json::to_value(&report).unwrap();
        let first = &json["findings"][0];
        assert!(first.get("label").is_some());
        assert!(first.get("severity").is_some());
        assert_eq!(json["summary"]["status"], "error");
    }

    #[test]
    fn test_report_includes_host_info_with_live_response() {
        let analyzer = Analyzer::new(evaluator(MockProbe::typical_host()));
        let mut live = MockLiveSource::healthy();
        let report = analyzer.analyze(Some(&mut live), &LiveDbSettings::default());
        let response = report
            .host_info
            .iter()
            .find(|r| r.label == "Database Response")
            .unwrap();
        assert_eq!(response.value, Value::from("1.25 ms"));

        let detached = analyzer.analyze(None, &LiveDbSettings::default());
        let response = detached
            .host_info
            .iter()
            .find(|r| r.label == "Database Response")
            .unwrap();
        assert_eq!(response.value, Value::NotAvailable);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["host_info"][0]["section"], "server");
    }
}
