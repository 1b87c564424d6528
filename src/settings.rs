use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GlError, Result};
use crate::ingest::IngestConfig;
use crate::validator::ValidationConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Stamped on every row when `--source-system` is not given.
    #[serde(default = "default_source_system")]
    pub default_source_system: String,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

fn default_source_system() -> String {
    "QuickBooks".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_source_system: default_source_system(),
            ingest: IngestConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("glprep")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Load settings from `path`, or from the default location. A missing or
/// unreadable file yields defaults.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if !path.exists() {
        debug!(path = %path.display(), "no settings file, using defaults");
        return Settings::default();
    }
    let content = std::fs::read_to_string(&path).unwrap_or_default();
    match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
            Settings::default()
        }
    }
}

/// Write settings as pretty JSON, creating parent directories. Returns the
/// path written.
pub fn save_settings(settings: &Settings, path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|e| GlError::Settings(e.to_string()))?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(path)
}
