pub mod config;
pub mod extensions;
pub mod versions;

use super::{EvaluationContext, Finding, FindingKind};

/// One fixed checklist walked by the evaluator.
pub trait Checklist: Send + Sync {
    fn kind(&self) -> FindingKind;
    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding>;
}

/// Checklists in report order.
pub fn all_checklists() -> Vec<Box<dyn Checklist>> {
    vec![
        Box::new(versions::VersionChecklist),
        Box::new(extensions::ExtensionChecklist),
        Box::new(config::ConfigChecklist),
    ]
}
