//! Pre-built probe scenarios for testing.
//!
//! These scenarios provide realistic host states for exercising the
//! evaluator, the health verdict and the performance heuristics.

use std::time::Duration;

use super::live::MockLiveSource;
use super::probe::MockProbe;
use crate::collector::traits::{
    CpuCounters, HostFacts, MemoryCounters, NetworkCounters, ResourceCounters, SecurityFacts,
    ServerFacts, SiteFacts, StatusCounters, StorageCounters,
};

const GIB: u64 = 1024 * 1024 * 1024;

const ALL_EXTENSIONS: [&str; 19] = [
    "curl", "dom", "exif", "fileinfo", "hash", "json", "mbstring", "mysqli", "libsodium",
    "openssl", "pcre", "imagick", "zip", "filter", "gd", "iconv", "simplexml", "xmlreader", "zlib",
];

#[allow(dead_code)]
impl MockProbe {
    /// A well-provisioned host: every baseline at or above recommended.
    pub fn typical_host() -> Self {
        let mut probe = Self::new()
            .with_version("php", "8.2.12")
            .with_version("mysql", "8.0.36-0ubuntu0.22.04.1")
            .with_server_software("Apache/2.4.57 (Debian)")
            .with_sapi("fpm-fcgi")
            .with_config("file_uploads", "1")
            .with_config("max_input_vars", "5000")
            .with_config("memory_limit", "512M")
            .with_config("post_max_size", "128M")
            .with_config("upload_max_filesize", "128M")
            .with_config("max_execution_time", "300")
            .with_config("max_input_time", "300")
            .with_resources(ResourceCounters {
                memory: MemoryCounters {
                    total_bytes: Some(16 * GIB),
                    used_bytes: Some(6 * GIB),
                    free_bytes: Some(10 * GIB),
                },
                cpu: CpuCounters {
                    model: Some("Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz".to_string()),
                    cores: Some(8),
                    load_average: Some([0.42, 0.35, 0.30]),
                },
                storage: StorageCounters {
                    total_bytes: Some(200 * GIB),
                    free_bytes: Some(120 * GIB),
                },
                network: NetworkCounters {
                    hostname: Some("web-01".to_string()),
                    server_ip: Some("10.0.0.12".to_string()),
                },
            })
            .with_facts(HostFacts {
                active_plugins: Some(vec![
                    "akismet".to_string(),
                    "wp-rocket".to_string(),
                    "redis-cache".to_string(),
                ]),
                external_object_cache: Some(true),
                server: ServerFacts {
                    os_name: Some("Linux".to_string()),
                    os_release: Some("6.1.0-18-amd64".to_string()),
                    machine: Some("x86_64".to_string()),
                    server_name: Some("shop.example.com".to_string()),
                    server_port: Some(443),
                    server_protocol: Some("HTTP/2.0".to_string()),
                    document_root: Some("/var/www/shop".to_string()),
                    server_admin: Some("ops@example.com".to_string()),
                    https: Some("on".to_string()),
                    forwarded_proto: None,
                    uptime_seconds: Some(356_460.0),
                },
                site: SiteFacts {
                    platform_version: Some("6.4.3".to_string()),
                    debug_mode: Some(false),
                    memory_limit: Some("256M".to_string()),
                    max_memory_limit: Some("512M".to_string()),
                    multisite: Some(false),
                    active_theme: Some("Storefront".to_string()),
                    locale: Some("en_US".to_string()),
                    timezone: Some("Europe/Berlin".to_string()),
                    site_url: Some("https://shop.example.com".to_string()),
                    home_url: Some("https://shop.example.com".to_string()),
                },
                security: SecurityFacts {
                    certificate_issuer: Some("R3".to_string()),
                    certificate_expires_at: Some(1_767_225_600),
                    response_headers: Some(vec![
                        "Strict-Transport-Security".to_string(),
                        "X-Content-Type-Options".to_string(),
                        "Content-Type".to_string(),
                    ]),
                },
            })
            .with_filesystem_latency(Duration::from_micros(1_250));
        for ext in ALL_EXTENSIONS {
            probe = probe.with_extension(ext, true);
        }
        probe
    }

    /// An outdated host: old runtime, missing required extension, low limits.
    ///
    /// Expected criticals: PHP version, MySQL version, cURL, memory_limit.
    /// Expected warnings: Exif (optional extension), max_input_vars.
    pub fn legacy_host() -> Self {
        let mut probe = Self::new()
            .with_version("php", "7.2.34")
            .with_version("mysql", "5.5.62")
            .with_server_software("nginx/1.18.0")
            .with_sapi("cgi-fcgi")
            .with_config("file_uploads", "On")
            .with_config("max_input_vars", "1000")
            .with_config("memory_limit", "64M")
            .with_config("post_max_size", "128M")
            .with_config("upload_max_filesize", "128M")
            .with_config("max_execution_time", "0")
            .with_config("max_input_time", "300")
            .with_facts(HostFacts {
                active_plugins: Some((0..35).map(|i| format!("plugin-{i}")).collect()),
                external_object_cache: Some(false),
                ..Default::default()
            });
        for ext in ALL_EXTENSIONS {
            let loaded = !matches!(ext, "curl" | "exif");
            probe = probe.with_extension(ext, loaded);
        }
        probe
    }
}

#[allow(dead_code)]
impl MockLiveSource {
    /// A small, healthy data store.
    pub fn healthy() -> Self {
        let mut source = Self::new();
        source.response_ms = 1.25;
        source.autoload_bytes = 300 * 1024;
        source.revisions = 120;
        source.database_size_bytes = 48 * 1024 * 1024;
        source.status = StatusCounters {
            threads_connected: 4,
            slow_queries: 2,
        };
        source
    }
}
