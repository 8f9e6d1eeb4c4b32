//! OpenAPI documentation definition.

use hostcheck_core::analysis::advisor::Recommendation;
use hostcheck_core::analysis::classify::Comparison;
use hostcheck_core::analysis::health::{HealthDetail, HealthStatus, HealthSummary};
use hostcheck_core::analysis::host_info::{InfoRow, InfoSection};
use hostcheck_core::analysis::performance::PerformanceIssue;
use hostcheck_core::analysis::resources::{ResourceGroup, ResourceRow};
use hostcheck_core::analysis::{
    Baseline, DiagnosticReport, Finding, FindingKind, ReportEntry, Severity,
};
use hostcheck_core::live::SamplerState;
use hostcheck_core::live::settings::{LiveDbSettings, SettingsInput};
use hostcheck_core::live::snapshot::{LiveMetricsSnapshot, Metric};
use hostcheck_core::slowlog::SlowQueryPattern;
use hostcheck_core::value::Value;
use utoipa::OpenApi;

use crate::handlers::{LiveResponse, RefreshResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::handle_health,
        crate::handlers::handle_report,
        crate::handlers::handle_live,
        crate::handlers::handle_refresh,
        crate::handlers::handle_get_settings,
        crate::handlers::handle_save_settings,
    ),
    components(schemas(
        DiagnosticReport,
        ReportEntry,
        Finding,
        FindingKind,
        Baseline,
        Comparison,
        Severity,
        Value,
        Recommendation,
        HealthSummary,
        HealthDetail,
        HealthStatus,
        PerformanceIssue,
        ResourceRow,
        ResourceGroup,
        InfoRow,
        InfoSection,
        LiveResponse,
        RefreshResponse,
        LiveMetricsSnapshot,
        Metric,
        SlowQueryPattern,
        SamplerState,
        LiveDbSettings,
        SettingsInput,
    )),
    info(
        title = "hostcheck API",
        version = "1.0",
        description = "Host environment diagnostics and live data-store metrics"
    )
)]
pub(crate) struct ApiDoc;
