//! Remediation texts, keyed by finding label.

use crate::analysis::FindingKind;

pub const VERSION_TEXTS: &[(&str, &str)] = &[
    (
        "PHP Version",
        "Update PHP through your hosting provider or server administrator. Newer PHP versions offer better performance and security.",
    ),
    (
        "MySQL Version",
        "Contact your hosting provider to upgrade MySQL/MariaDB for improved performance and security features.",
    ),
];

pub const CONFIG_TEXTS: &[(&str, &str)] = &[
    (
        "memory_limit",
        "Increase PHP memory limit in php.ini or contact your hosting provider. Higher memory allows WordPress to handle more complex operations.",
    ),
    (
        "max_execution_time",
        "Increase max execution time in php.ini to prevent script timeouts during intensive operations.",
    ),
    (
        "post_max_size",
        "Increase post_max_size in php.ini to allow larger form submissions and file uploads.",
    ),
    (
        "upload_max_filesize",
        "Increase upload_max_filesize in php.ini to allow larger file uploads through WordPress media library.",
    ),
    (
        "max_input_vars",
        "Increase max_input_vars in php.ini to handle forms with many fields, especially useful for theme customizers.",
    ),
    (
        "max_input_time",
        "Increase max_input_time in php.ini to allow more time for processing form data.",
    ),
    (
        "file_uploads",
        "Enable file_uploads in php.ini to allow file uploads through WordPress.",
    ),
];

pub const EXTENSION_TEXTS: &[(&str, &str)] = &[
    (
        "cURL",
        "Install php-curl extension. Required for HTTP requests, plugin updates, and external API communications.",
    ),
    (
        "GD",
        "Install php-gd extension. Required for image processing, thumbnail generation, and image editing features.",
    ),
    (
        "MySQLi",
        "Install php-mysqli extension. Required for database connectivity and operations.",
    ),
    (
        "OpenSSL",
        "Install php-openssl extension. Required for secure connections and SSL/TLS communications.",
    ),
    (
        "Multibyte String",
        "Install php-mbstring extension. Required for proper handling of international characters and UTF-8 text.",
    ),
    (
        "JSON",
        "Install php-json extension. Required for data exchange and API communications.",
    ),
    (
        "File Info",
        "Install php-fileinfo extension. Required for file type detection and security validation.",
    ),
    (
        "Zip",
        "Install php-zip extension. Required for plugin/theme installation and backup operations.",
    ),
    (
        "DOM",
        "Install php-dom extension. Required for XML processing and HTML manipulation.",
    ),
    (
        "SimpleXML",
        "Install php-simplexml extension. Required for XML parsing and RSS feed processing.",
    ),
    (
        "XMLReader",
        "Install php-xmlreader extension. Required for efficient XML processing.",
    ),
    (
        "ImageMagick",
        "Install php-imagick extension. Recommended for advanced image processing and better image quality.",
    ),
    (
        "Sodium",
        "Install php-sodium extension. Recommended for modern cryptographic operations and enhanced security.",
    ),
    (
        "Exif",
        "Install php-exif extension. Recommended for reading image metadata and EXIF data.",
    ),
];

/// Fallback when a label has no specific text.
pub fn generic_text(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::Version => {
            "Contact your hosting provider or system administrator to upgrade this component."
        }
        FindingKind::Configuration => {
            "Modify your php.ini file or contact your hosting provider to adjust this setting."
        }
        FindingKind::Extension => {
            "Install this PHP extension through your package manager or contact your hosting provider."
        }
    }
}

/// Directives that may receive a config-override snippet.
pub const PATCHABLE_DIRECTIVES: [&str; 7] = [
    "memory_limit",
    "max_execution_time",
    "max_input_time",
    "post_max_size",
    "upload_max_filesize",
    "max_input_vars",
    "file_uploads",
];
