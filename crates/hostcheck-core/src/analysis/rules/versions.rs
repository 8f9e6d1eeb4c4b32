use crate::analysis::classify::Comparison;
use crate::analysis::{EvaluationContext, Finding, FindingKind};
use crate::value::Value;

use super::Checklist;

pub const WEB_SERVER_LABEL: &str = "Web Server";
pub const SAPI_LABEL: &str = "PHP SAPI";
pub const NOT_DETECTED: &str = "Not detected";

const KNOWN_SERVERS: [(&str, &str); 5] = [
    ("apache", "Apache"),
    ("litespeed", "LiteSpeed"),
    ("nginx", "Nginx"),
    ("lighttpd", "lighttpd"),
    ("iis", "Microsoft IIS"),
];

/// Maps a raw server-software string to a known server name.
///
/// Case-insensitive substring match, first hit wins.
pub fn detect_web_server(raw: &str) -> &'static str {
    let raw = raw.to_ascii_lowercase();
    KNOWN_SERVERS
        .iter()
        .find(|(needle, _)| raw.contains(needle))
        .map_or(NOT_DETECTED, |(_, name)| name)
}

/// Maps a raw SAPI name to the execution mode shown in the report.
pub fn classify_sapi(raw: &str) -> &'static str {
    let raw = raw.to_ascii_lowercase();
    // "fpm-fcgi" also contains "cgi"
    if raw.contains("fpm") {
        "PHP-FPM (Recommended)"
    } else if raw.contains("cgi") {
        "CGI"
    } else {
        "Apache Module"
    }
}

// ============================================================
// VersionChecklist
// ============================================================

pub struct VersionChecklist;

impl Checklist for VersionChecklist {
    fn kind(&self) -> FindingKind {
        FindingKind::Version
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<Finding> {
        let server = match ctx.probe.server_software() {
            Ok(raw) => detect_web_server(&raw),
            Err(_) => NOT_DETECTED,
        };
        let sapi = ctx.value_or_unavailable(
            "sapi",
            ctx.probe
                .runtime_sapi()
                .map(|raw| Value::from(classify_sapi(&raw))),
        );

        let mut findings = vec![
            Finding::info(FindingKind::Version, "web_server", WEB_SERVER_LABEL, Value::from(server)),
            Finding::info(FindingKind::Version, "sapi", SAPI_LABEL, sapi),
        ];

        for req in &ctx.catalog.versions {
            let current =
                ctx.value_or_unavailable(&req.key, ctx.probe.version(&req.key).map(Value::from));
            findings.push(Finding::classified(
                FindingKind::Version,
                req,
                Comparison::Version,
                current,
            ));
        }
        findings
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
        VersionChecklist.evaluate(&ctx)
    }

    #[test]
    fn test_detects_web_servers() {
        assert_eq!(detect_web_server("Apache/2.4.57 (Ubuntu)"), "Apache");
        assert_eq!(detect_web_server("nginx/1.24.0"), "Nginx");
        assert_eq!(detect_web_server("LiteSpeed"), "LiteSpeed");
        assert_eq!(detect_web_server("lighttpd/1.4.71"), "lighttpd");
        assert_eq!(detect_web_server("Microsoft-IIS/10.0"), "Microsoft IIS");
        assert_eq!(detect_web_server("Caddy"), NOT_DETECTED);
        assert_eq!(detect_web_server(""), NOT_DETECTED);
    }

    #[test]
    fn test_classifies_sapi() {
        assert_eq!(classify_sapi("fpm-fcgi"), "PHP-FPM (Recommended)");
        assert_eq!(classify_sapi("cgi-fcgi"), "CGI");
        assert_eq!(classify_sapi("apache2handler"), "Apache Module");
    }

    #[test]
    fn test_legacy_versions_are_critical() {
        let findings = run(&MockProbe::legacy_host());
        assert_eq!(findings.len(), 4);
        assert_eq!(findings[0].current, Value::from("Nginx"));
        assert_eq!(findings[1].current, Value::from("CGI"));
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[1].severity, Severity::Info);
        assert_eq!(findings[2].label, "PHP Version");
        assert_eq!(findings[2].severity, Severity::Critical);
        assert_eq!(findings[3].label, "MySQL Version");
        assert_eq!(findings[3].severity, Severity::Critical);
    }

    #[test]
    fn test_version_between_baselines_is_warning() {
        let probe = MockProbe::typical_host().with_version("php", "8.0.30");
        let php = run(&probe).into_iter().find(|f| f.key == "php").unwrap();
        assert_eq!(php.severity, Severity::Warning);
    }

    #[test]
    fn test_vendor_suffix_is_ignored() {
        let mysql = run(&MockProbe::typical_host())
            .into_iter()
            .find(|f| f.key == "mysql")
            .unwrap();
        assert_eq!(mysql.severity, Severity::Ok);
    }

    #[test]
    fn test_missing_version_is_info() {
        let findings = run(&MockProbe::new());
        assert_eq!(findings[0].current, Value::from(NOT_DETECTED));
        assert_eq!(findings[1].current, Value::NotAvailable);
        assert!(findings[2..].iter().all(|f| f.severity == Severity::Info));
        assert!(findings[2..].iter().all(|f| f.current == Value::NotAvailable));
    }
}
