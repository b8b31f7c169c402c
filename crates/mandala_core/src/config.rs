//! Persisted application settings.
//!
//! # Responsibility
//! - Remember the last chart path and autosave/logging preferences
//!   between launches.
//!
//! # Invariants
//! - A missing settings file yields defaults, never an error.
//! - Unknown fields are ignored and missing fields take defaults, so old
//!   and new settings files stay readable.

use crate::logging::default_log_level;
use crate::repo::chart_store::write_text_atomic;
use crate::service::autosave::DEFAULT_AUTOSAVE_DELAY;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Conventional settings filename inside the host's config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Host-level preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Chart reopened on the next launch.
    pub last_save_path: Option<PathBuf>,
    /// Autosave quiet period in milliseconds; `0` disables autosave.
    pub autosave_delay_ms: u64,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_save_path: None,
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY.as_millis() as u64,
            log_level: default_log_level().to_string(),
        }
    }
}

impl AppSettings {
    /// Autosave quiet period, or `None` when autosave is off.
    pub fn autosave_delay(&self) -> Option<Duration> {
        (self.autosave_delay_ms > 0).then(|| Duration::from_millis(self.autosave_delay_ms))
    }
}

/// Settings file failure.
#[derive(Debug)]
pub enum SettingsError {
    Io { path: PathBuf, source: io::Error },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "invalid settings file {}: {source}", path.display())
            }
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Reads settings from `path`, returning defaults when it does not exist.
pub fn load_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(AppSettings::default()),
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes settings to `path` as pretty JSON, creating parent directories.
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    let io_error = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let text = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    write_text_atomic(path, &text).map_err(io_error)
}
