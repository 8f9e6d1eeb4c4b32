//! Informational server, site, hosting and security rows.
//!
//! Nothing here is classified. Every row is shown as-is, and facts the host
//! cannot supply read "Not available".

use chrono::DateTime;
use serde::Serialize;
use tracing::debug;

use crate::collector::traits::{EnvironmentProbe, HostFacts, SecurityFacts, ServerFacts, SiteFacts};
use crate::fmt::{format_decimal, format_load_average};
use crate::value::Value;

use super::rules::versions::detect_web_server;

/// Headers counted by the "Security Headers" row.
pub const SECURITY_HEADERS: [&str; 4] = [
    "X-Frame-Options",
    "X-XSS-Protection",
    "X-Content-Type-Options",
    "Strict-Transport-Security",
];

pub const UNKNOWN_PROVIDER: &str = "Unknown";

/// Provider name and the lowercase keywords that identify it. First hit wins.
const HOSTING_PROVIDERS: [(&str, &[&str]); 17] = [
    ("SiteGround", &["siteground", "sg-server"]),
    ("Bluehost", &["bluehost", "hostmonster"]),
    ("GoDaddy", &["godaddy", "secureserver"]),
    ("HostGator", &["hostgator", "gator"]),
    ("WP Engine", &["wpengine", "wpenginepowered"]),
    ("Kinsta", &["kinsta", "gcp"]),
    ("Cloudways", &["cloudways"]),
    ("A2 Hosting", &["a2hosting"]),
    ("InMotion Hosting", &["inmotionhosting"]),
    ("DreamHost", &["dreamhost"]),
    ("Namecheap", &["namecheap"]),
    ("DigitalOcean", &["digitalocean"]),
    ("Linode", &["linode"]),
    ("Vultr", &["vultr"]),
    ("Amazon Web Services", &["amazonaws", "aws"]),
    ("Google Cloud", &["googlecloud", "gcp"]),
    ("Microsoft Azure", &["azure", "microsoft"]),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum InfoSection {
    Server,
    Site,
    Hosting,
    Security,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct InfoRow {
    pub section: InfoSection,
    #[cfg_attr(feature = "api", schema(value_type = String))]
    pub label: &'static str,
    pub value: Value,
}

fn row(section: InfoSection, label: &'static str, value: Option<impl Into<Value>>) -> InfoRow {
    InfoRow {
        section,
        label,
        value: value.map_or(Value::NotAvailable, Into::into),
    }
}

fn enabled(on: bool) -> &'static str {
    if on { "Enabled" } else { "Disabled" }
}

fn yes_no(on: bool) -> &'static str {
    if on { "Yes" } else { "No" }
}

fn millis(ms: f64) -> String {
    format!("{} ms", format_decimal(ms))
}

// ============================================================
// Detection helpers
// ============================================================

/// Whether the request reached the site over TLS.
///
/// `None` when the host reports none of the three signals.
pub fn is_https(server: &ServerFacts) -> Option<bool> {
    if server.https.is_none() && server.server_port.is_none() && server.forwarded_proto.is_none() {
        return None;
    }
    let flag = server
        .https
        .as_deref()
        .map(str::trim)
        .is_some_and(|v| !v.is_empty() && !v.eq_ignore_ascii_case("off"));
    let forwarded = server
        .forwarded_proto
        .as_deref()
        .is_some_and(|p| p.trim().eq_ignore_ascii_case("https"));
    Some(flag || server.server_port == Some(443) || forwarded)
}

/// Guesses the hosting provider from host identity strings.
///
/// Each candidate is lowercased and searched for every provider keyword in
/// table order.
pub fn detect_hosting_provider(candidates: &[Option<&str>]) -> Option<&'static str> {
    let haystack: Vec<String> = candidates
        .iter()
        .flatten()
        .map(|s| s.to_ascii_lowercase())
        .collect();
    HOSTING_PROVIDERS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|kw| haystack.iter().any(|h| h.contains(kw)))
        })
        .map(|(name, _)| *name)
}

/// `"4 days, 3 hours, 1 minutes"`. Negative or non-finite input yields `None`.
pub fn format_uptime(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let total = seconds as u64;
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;
    Some(format!("{days} days, {hours} hours, {minutes} minutes"))
}

fn format_os(server: &ServerFacts) -> Option<String> {
    let name = server.os_name.as_deref()?;
    let mut out = name.to_string();
    if let Some(release) = &server.os_release {
        out.push(' ');
        out.push_str(release);
    }
    if let Some(machine) = &server.machine {
        out.push_str(&format!(" ({machine})"));
    }
    Some(out)
}

/// UTC `"%Y-%m-%d %H:%M:%S"`.
fn format_expiry(unix: i64) -> Option<String> {
    DateTime::from_timestamp(unix, 0).map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Number of [`SECURITY_HEADERS`] present, matched case-insensitively.
pub fn count_security_headers(headers: &[String]) -> usize {
    SECURITY_HEADERS
        .iter()
        .filter(|wanted| headers.iter().any(|h| h.trim().eq_ignore_ascii_case(wanted)))
        .count()
}

// ============================================================
// Rows
// ============================================================

fn server_rows(probe: &dyn EnvironmentProbe, server: &ServerFacts) -> Vec<InfoRow> {
    use InfoSection::Server;

    let resources = probe.resource_counters();
    let software = probe
        .server_software()
        .map_err(|e| debug!(error = %e, "server software unavailable"))
        .ok();

    vec![
        row(Server, "Server Software", software.as_deref().map(detect_web_server)),
        row(Server, "Server OS", format_os(server)),
        row(Server, "Server Architecture", server.machine.clone()),
        row(Server, "Server IP Address", resources.network.server_ip),
        row(Server, "Document Root", server.document_root.clone()),
        row(Server, "Server Admin", server.server_admin.clone()),
        row(Server, "Server Port", server.server_port.map(i64::from)),
        row(Server, "HTTPS", is_https(server).map(enabled)),
        row(Server, "Server Protocol", server.server_protocol.clone()),
        row(
            Server,
            "Server Load",
            resources.cpu.load_average.as_ref().map(format_load_average),
        ),
        row(Server, "Uptime", server.uptime_seconds.and_then(format_uptime)),
    ]
}

fn site_rows(facts: &HostFacts) -> Vec<InfoRow> {
    use InfoSection::Site;

    let site: &SiteFacts = &facts.site;
    vec![
        row(Site, "WordPress Version", site.platform_version.clone()),
        row(Site, "WordPress Debug Mode", site.debug_mode.map(enabled)),
        row(Site, "WordPress Memory Limit", site.memory_limit.clone()),
        row(Site, "WordPress Max Memory Limit", site.max_memory_limit.clone()),
        row(Site, "WordPress Multisite", site.multisite.map(yes_no)),
        row(Site, "Active Theme", site.active_theme.clone()),
        row(
            Site,
            "Active Plugins",
            facts.active_plugins.as_ref().map(|p| p.len() as i64),
        ),
        row(Site, "WordPress Language", site.locale.clone()),
        row(Site, "WordPress Timezone", site.timezone.clone()),
        row(Site, "WordPress URL", site.site_url.clone()),
        row(Site, "Home URL", site.home_url.clone()),
    ]
}

fn hosting_rows(
    probe: &dyn EnvironmentProbe,
    facts: &HostFacts,
    db_response_ms: Option<f64>,
) -> Vec<InfoRow> {
    use InfoSection::Hosting;

    let software = probe.server_software().ok();
    let hostname = probe.resource_counters().network.hostname;
    let provider = detect_hosting_provider(&[
        software.as_deref(),
        hostname.as_deref(),
        facts.server.server_name.as_deref(),
    ]);
    let fs = probe
        .filesystem_latency()
        .map_err(|e| debug!(error = %e, "filesystem timing unavailable"))
        .ok();

    vec![
        row(Hosting, "Hosting Provider", Some(provider.unwrap_or(UNKNOWN_PROVIDER))),
        row(
            Hosting,
            "Provider Confidence",
            Some(if provider.is_some() { "High" } else { "N/A" }),
        ),
        row(Hosting, "Database Response", db_response_ms.map(millis)),
        row(
            Hosting,
            "File System Speed",
            fs.map(|d| millis(d.as_secs_f64() * 1000.0)),
        ),
    ]
}

fn security_rows(server: &ServerFacts, security: &SecurityFacts) -> Vec<InfoRow> {
    use InfoSection::Security;

    let https = is_https(server);
    // certificate details only make sense for a TLS request
    let tls = https == Some(true);
    vec![
        row(Security, "SSL Certificate", https.map(enabled)),
        row(
            Security,
            "SSL Issuer",
            security.certificate_issuer.clone().filter(|_| tls),
        ),
        row(
            Security,
            "SSL Expiry",
            security
                .certificate_expires_at
                .filter(|_| tls)
                .and_then(format_expiry),
        ),
        row(
            Security,
            "Security Headers",
            security.response_headers.as_deref().map(|h| {
                format!("{}/{}", count_security_headers(h), SECURITY_HEADERS.len())
            }),
        ),
    ]
}

/// Server, site, hosting and security rows in display order.
///
/// `db_response_ms` comes from the live source when one was available.
pub fn host_info_rows(probe: &dyn EnvironmentProbe, db_response_ms: Option<f64>) -> Vec<InfoRow> {
    let facts = probe.host_facts();
    let mut rows = server_rows(probe, &facts.server);
    rows.extend(site_rows(&facts));
    rows.extend(hosting_rows(probe, &facts, db_response_ms));
    rows.extend(security_rows(&facts.server, &facts.security));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockProbe;
    use crate::collector::traits::{NetworkCounters, ResourceCounters};

    fn value_of<'a>(rows: &'a [InfoRow], label: &str) -> &'a Value {
        &rows
            .iter()
            .find(|r| r.label == label)
            .unwrap_or_else(|| panic!("missing row {label}"))
            .value
    }

    fn text(rows: &[InfoRow], label: &str) -> String {
        value_of(rows, label).to_string()
    }

    #[test]
    fn test_typical_host_rows() {
        let rows = host_info_rows(&MockProbe::typical_host(), Some(1.25));

        assert_eq!(text(&rows, "Server Software"), "Apache");
        assert_eq!(text(&rows, "Server OS"), "Linux 6.1.0-18-amd64 (x86_64)");
        assert_eq!(text(&rows, "Server Architecture"), "x86_64");
        assert_eq!(text(&rows, "Server IP Address"), "10.0.0.12");
        assert_eq!(text(&rows, "Server Port"), "443");
        assert_eq!(text(&rows, "HTTPS"), "Enabled");
        assert_eq!(text(&rows, "Server Load"), "0.42, 0.35, 0.3");
        assert_eq!(text(&rows, "Uptime"), "4 days, 3 hours, 1 minutes");

        assert_eq!(text(&rows, "WordPress Version"), "6.4.3");
        assert_eq!(text(&rows, "WordPress Debug Mode"), "Disabled");
        assert_eq!(text(&rows, "WordPress Multisite"), "No");
        assert_eq!(text(&rows, "Active Plugins"), "3");

        assert_eq!(text(&rows, "Hosting Provider"), UNKNOWN_PROVIDER);
        assert_eq!(text(&rows, "Provider Confidence"), "N/A");
        assert_eq!(text(&rows, "Database Response"), "1.25 ms");
        assert_eq!(text(&rows, "File System Speed"), "1.25 ms");

        assert_eq!(text(&rows, "SSL Certificate"), "Enabled");
        assert_eq!(text(&rows, "SSL Issuer"), "R3");
        assert_eq!(text(&rows, "SSL Expiry"), "2026-01-01 00:00:00");
        assert_eq!(text(&rows, "Security Headers"), "2/4");
    }

    #[test]
    fn test_sections_keep_display_order() {
        let rows = host_info_rows(&MockProbe::typical_host(), None);
        let mut sections: Vec<InfoSection> = rows.iter().map(|r| r.section).collect();
        sections.dedup();
        assert_eq!(
            sections,
            [
                InfoSection::Server,
                InfoSection::Site,
                InfoSection::Hosting,
                InfoSection::Security
            ]
        );
    }

    #[test]
    fn test_bare_host_reads_not_available() {
        let rows = host_info_rows(&MockProbe::new(), None);
        for label in [
            "Server Software",
            "Server OS",
            "Uptime",
            "HTTPS",
            "WordPress Version",
            "Active Plugins",
            "Database Response",
            "File System Speed",
            "SSL Certificate",
            "SSL Issuer",
            "Security Headers",
        ] {
            assert_eq!(value_of(&rows, label), &Value::NotAvailable, "{label}");
        }
        // provider detection always answers
        assert_eq!(text(&rows, "Hosting Provider"), UNKNOWN_PROVIDER);
    }

    #[test]
    fn test_https_signals() {
        let on = |https: Option<&str>, port: Option<u16>, proto: Option<&str>| {
            is_https(&ServerFacts {
                https: https.map(str::to_string),
                server_port: port,
                forwarded_proto: proto.map(str::to_string),
                ..Default::default()
            })
        };
        assert_eq!(on(None, None, None), None);
        assert_eq!(on(Some("on"), None, None), Some(true));
        assert_eq!(on(Some("1"), Some(80), None), Some(true));
        assert_eq!(on(Some("off"), Some(80), None), Some(false));
        assert_eq!(on(Some("OFF"), None, None), Some(false));
        assert_eq!(on(Some(""), Some(80), None), Some(false));
        assert_eq!(on(None, Some(443), None), Some(true));
        assert_eq!(on(Some("off"), Some(8080), Some("https")), Some(true));
        assert_eq!(on(None, Some(8080), Some("http")), Some(false));
    }

    #[test]
    fn test_provider_detection_order() {
        assert_eq!(
            detect_hosting_provider(&[Some("Apache"), Some("sg-server-42"), None]),
            Some("SiteGround")
        );
        assert_eq!(
            detect_hosting_provider(&[None, Some("ip-10-0-0-1.ec2.AmazonAWS.com")]),
            Some("Amazon Web Services")
        );
        // "gcp" is listed for both, Kinsta comes first
        assert_eq!(
            detect_hosting_provider(&[Some("nginx"), Some("gcp-host-1")]),
            Some("Kinsta")
        );
        assert_eq!(detect_hosting_provider(&[Some("nginx"), Some("web-01")]), None);
        assert_eq!(detect_hosting_provider(&[]), None);
    }

    #[test]
    fn test_provider_row_from_hostname() {
        let probe = MockProbe::new().with_resources(ResourceCounters {
            network: NetworkCounters {
                hostname: Some("box123.bluehost.com".to_string()),
                server_ip: None,
            },
            ..Default::default()
        });
        let rows = host_info_rows(&probe, None);
        assert_eq!(text(&rows, "Hosting Provider"), "Bluehost");
        assert_eq!(text(&rows, "Provider Confidence"), "High");
    }

    #[test]
    fn test_uptime_formatting() {
        assert_eq!(format_uptime(0.0).as_deref(), Some("0 days, 0 hours, 0 minutes"));
        assert_eq!(format_uptime(90_061.9).as_deref(), Some("1 days, 1 hours, 1 minutes"));
        assert_eq!(format_uptime(-1.0), None);
        assert_eq!(format_uptime(f64::NAN), None);
    }

    #[test]
    fn test_certificate_hidden_without_tls() {
        let server = ServerFacts {
            https: Some("off".to_string()),
            server_port: Some(80),
            ..Default::default()
        };
        let security = SecurityFacts {
            certificate_issuer: Some("R3".to_string()),
            certificate_expires_at: Some(0),
            response_headers: Some(Vec::new()),
        };
        let rows = security_rows(&server, &security);
        assert_eq!(text(&rows, "SSL Certificate"), "Disabled");
        assert_eq!(value_of(&rows, "SSL Issuer"), &Value::NotAvailable);
        assert_eq!(value_of(&rows, "SSL Expiry"), &Value::NotAvailable);
        assert_eq!(text(&rows, "Security Headers"), "0/4");
    }

    #[test]
    fn test_security_headers_match_case_insensitively() {
        let headers = ["x-frame-options", "X-XSS-Protection ", "Server"].map(String::from);
        assert_eq!(count_security_headers(&headers), 2);
    }
}
