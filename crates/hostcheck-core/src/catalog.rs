//! Requirement baselines.
//!
//! The catalog is immutable after construction and shared by reference
//! (`Arc<RequirementCatalog>`) with every evaluator. The built-in baselines
//! can be replaced by a JSON document with the same shape.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::Severity;
use crate::analysis::classify::Comparison;
use crate::value::Value;

/// One tracked requirement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Probe key: component name, extension name, or config directive.
    pub key: String,
    /// Human-readable label used in findings and recommendation lookups.
    pub label: String,
    pub required: Value,
    pub recommended: Value,
    /// Severity to report when a flag is below `recommended` but satisfies `required`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Severity>,
    /// Magnitude the host uses to mean "no limit" (e.g. `memory_limit = -1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<i64>,
}

impl Requirement {
    fn new(key: &str, label: &str, required: impl Into<Value>, recommended: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required: required.into(),
            recommended: recommended.into(),
            shortfall: None,
            unlimited: None,
        }
    }

    fn with_shortfall(mut self, severity: Severity) -> Self {
        self.shortfall = Some(severity);
        self
    }

    fn with_unlimited(mut self, sentinel: i64) -> Self {
        self.unlimited = Some(sentinel);
        self
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "catalog: {e}"),
            CatalogError::Parse(e) => write!(f, "catalog: invalid JSON: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Baselines for the three checklists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequirementCatalog {
    pub versions: Vec<Requirement>,
    pub extensions: Vec<Requirement>,
    pub config: Vec<Requirement>,
}

impl Default for RequirementCatalog {
    fn default() -> Self {
        let ext = |key: &str, label: &str, required: bool, recommended: bool| {
            let r = Requirement::new(key, label, required, recommended);
            if recommended && !required {
                r.with_shortfall(Severity::Warning)
            } else {
                r
            }
        };

        Self {
            versions: vec![
                Requirement::new("php", "PHP Version", "7.4", "8.1"),
                Requirement::new("mysql", "MySQL Version", "5.6", "8.0"),
            ],
            extensions: vec![
                ext("curl", "cURL", true, true),
                ext("dom", "DOM", true, true),
                ext("exif", "Exif", false, true),
                ext("fileinfo", "File Info", true, true),
                ext("hash", "Hash", true, true),
                ext("json", "JSON", true, true),
                ext("mbstring", "Multibyte String", true, true),
                ext("mysqli", "MySQLi", true, true),
                ext("libsodium", "Sodium", false, true),
                ext("openssl", "OpenSSL", true, true),
                ext("pcre", "PCRE", true, true),
                ext("imagick", "ImageMagick", false, true),
                ext("zip", "Zip", true, true),
                ext("filter", "Filter", true, true),
                ext("gd", "GD", true, true),
                ext("iconv", "Iconv", false, true),
                ext("simplexml", "SimpleXML", true, true),
                ext("xmlreader", "XMLReader", true, true),
                ext("zlib", "Zlib", true, true),
            ],
            config: vec![
                Requirement::new("file_uploads", "file_uploads", true, true),
                Requirement::new("max_input_vars", "max_input_vars", 1000_i64, 3000_i64),
                Requirement::new("memory_limit", "memory_limit", "128M", "512M").with_unlimited(-1),
                Requirement::new("post_max_size", "post_max_size", "32M", "128M"),
                Requirement::new("upload_max_filesize", "upload_max_filesize", "32M", "128M"),
                Requirement::new("max_execution_time", "max_execution_time", 30_i64, 300_i64)
                    .with_unlimited(0),
                Requirement::new("max_input_time", "max_input_time", 60_i64, 300_i64),
            ],
        }
    }
}

impl RequirementCatalog {
    /// Loads a catalog from a JSON file and logs any baseline inconsistencies.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(CatalogError::Io)?;
        let catalog: Self = serde_json::from_str(&text).map_err(CatalogError::Parse)?;
        for issue in catalog.validate() {
            warn!(path = %path.display(), issue, "catalog baseline inconsistency");
        }
        Ok(catalog)
    }

    /// Reports requirements whose `required` exceeds `recommended`.
    ///
    /// Classification tolerates these; the list exists so operators can fix the data.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let lists = [
            (Comparison::Version, &self.versions),
            (Comparison::Flag, &self.extensions),
        ];
        for (comparison, list) in lists {
            for r in list {
                if comparison.exceeds(&r.required, &r.recommended) {
                    issues.push(format!("{}: required exceeds recommended", r.label));
                }
            }
        }
        for r in &self.config {
            let comparison = Comparison::for_config(&r.required);
            if comparison.exceeds(&r.required, &r.recommended) {
                issues.push(format!("{}: required exceeds recommended", r.label));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_consistent() {
        assert!(RequirementCatalog::default().validate().is_empty());
    }

    #[test]
    fn test_optional_extensions_carry_shortfall() {
        let catalog = RequirementCatalog::default();
        let exif = catalog.extensions.iter().find(|r| r.key == "exif").unwrap();
        assert_eq!(exif.shortfall, Some(Severity::Warning));
        let curl = catalog.extensions.iter().find(|r| r.key == "curl").unwrap();
        assert_eq!(curl.shortfall, None);
    }

    #[test]
    fn test_validate_flags_inverted_baselines() {
        let mut catalog = RequirementCatalog::default();
        catalog.config[2].required = Value::from("1G");
        catalog.versions[0].required = Value::from("9.0");
        let issues = catalog.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.starts_with("memory_limit")));
        assert!(issues.iter().any(|i| i.starts_with("PHP Version")));
    }

    #[test]
    fn test_loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let json = serde_json::to_string(&RequirementCatalog::default()).unwrap();
        std::fs::write(&path, json).unwrap();

        let loaded = RequirementCatalog::from_json_file(&path).unwrap();
        assert_eq!(loaded, RequirementCatalog::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RequirementCatalog::from_json_file(Path::new("/nonexistent/catalog.json"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
