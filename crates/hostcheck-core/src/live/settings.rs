//! Live sampler settings and their persistence.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const MIN_INTERVAL_SECONDS: u64 = 5;
pub const MAX_INTERVAL_SECONDS: u64 = 120;
pub const MIN_MAX_PATTERNS: usize = crate::slowlog::MIN_PATTERNS;
pub const MAX_MAX_PATTERNS: usize = crate::slowlog::MAX_PATTERNS;

/// Live sampler configuration.
///
/// Field names on the wire follow the polling endpoint contract
/// (`interval`, not `interval_seconds`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct LiveDbSettings {
    pub enabled: bool,
    #[serde(rename = "interval")]
    pub interval_seconds: u64,
    pub max_patterns: usize,
    pub lightweight_mode: bool,
}

impl Default for LiveDbSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 10,
            max_patterns: 5,
            lightweight_mode: true,
        }
    }
}

impl LiveDbSettings {
    /// Returns a copy with every numeric field inside its allowed range.
    pub fn clamped(self) -> Self {
        Self {
            interval_seconds: self
                .interval_seconds
                .clamp(MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS),
            max_patterns: self.max_patterns.clamp(MIN_MAX_PATTERNS, MAX_MAX_PATTERNS),
            ..self
        }
    }

    /// Applies a partial update; absent fields keep their current value.
    pub fn merged(self, input: &SettingsInput) -> Self {
        let interval_seconds = match input.interval {
            Some(v) => v.clamp(MIN_INTERVAL_SECONDS as i64, MAX_INTERVAL_SECONDS as i64) as u64,
            None => self.interval_seconds,
        };
        let max_patterns = match input.max_patterns {
            Some(v) => v.clamp(MIN_MAX_PATTERNS as i64, MAX_MAX_PATTERNS as i64) as usize,
            None => self.max_patterns,
        };
        Self {
            enabled: input.enabled.unwrap_or(self.enabled),
            interval_seconds,
            max_patterns,
            lightweight_mode: input.lightweight_mode.unwrap_or(self.lightweight_mode),
        }
        .clamped()
    }
}

/// Untrusted settings update from the polling endpoint.
///
/// Numbers are signed so out-of-range input (`0`, `-5`, `9999`) can be
/// clamped rather than rejected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct SettingsInput {
    pub enabled: Option<bool>,
    pub interval: Option<i64>,
    pub max_patterns: Option<i64>,
    pub lightweight_mode: Option<bool>,
}

// ============================================================
// Persistence
// ============================================================

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "settings store: {e}"),
            SettingsError::Parse(e) => write!(f, "settings store: invalid record: {e}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Parse(e)
    }
}

/// Single-record settings persistence. Last write wins.
pub trait SettingsStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<LiveDbSettings>, SettingsError>;
    fn save(&self, settings: &LiveDbSettings) -> Result<(), SettingsError>;
}

#[derive(Default)]
pub struct MemorySettingsStore {
    record: Mutex<Option<LiveDbSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<LiveDbSettings>, SettingsError> {
        Ok(*self.record.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn save(&self, settings: &LiveDbSettings) -> Result<(), SettingsError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(*settings);
        Ok(())
    }
}

/// Stores the record as a JSON file, replaced atomically on save.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> Result<Option<LiveDbSettings>, SettingsError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settings: LiveDbSettings = serde_json::from_str(&text)?;
        Ok(Some(settings.clamped()))
    }

    fn save(&self, settings: &LiveDbSettings) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, settings)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "live settings saved");
        Ok(())
    }
}

/// Loads the record, falling back to defaults on absence or error.
pub fn load_or_default(store: &dyn SettingsStore) -> LiveDbSettings {
    match store.load() {
        Ok(Some(s)) => s,
        Ok(None) => LiveDbSettings::default(),
        Err(e) => {
            warn!(error = %e, "failed to load live settings, using defaults");
            LiveDbSettings::default()
        }
    }
}
