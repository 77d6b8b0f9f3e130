//! Application settings storage
//!
//! Stores server configuration in a JSON file in the app data directory.
//! Environment variables take precedence over stored values.

use crate::error::{GradeError, Result};
use crate::grading::GradeThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Global settings instance
static SETTINGS: RwLock<Option<Settings>> = RwLock::new(None);

/// Path to config file (set during init)
static CONFIG_PATH: RwLock<Option<PathBuf>> = RwLock::new(None);

pub const BIND_ENV: &str = "EVIGRADE_BIND";
pub const MAX_UPLOAD_ENV: &str = "EVIGRADE_MAX_UPLOAD_BYTES";
pub const CONFIG_ENV: &str = "EVIGRADE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Upper bound on request bodies, uploads included
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Characters of decoded text echoed back by /process_pdf
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    #[serde(default)]
    pub thresholds: GradeThresholds,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024 // 16 MiB
}

fn default_preview_chars() -> usize {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload_bytes(),
            preview_chars: default_preview_chars(),
            thresholds: GradeThresholds::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk or create default
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Settings::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
                Settings::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read settings");
                Settings::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| GradeError::Config(format!("Failed to serialize settings: {}", e)))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `EVIGRADE_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bind) = std::env::var(BIND_ENV) {
            if !bind.is_empty() {
                self.bind_addr = bind;
            }
        }
        if let Ok(raw) = std::env::var(MAX_UPLOAD_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(bytes) if bytes > 0 => self.max_upload_bytes = bytes,
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", MAX_UPLOAD_ENV),
            }
        }
        self
    }
}

/// Default data directory, e.g. ~/.local/share/evigrade
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("evigrade"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve the settings file: `EVIGRADE_CONFIG`, else `<data dir>/settings.json`
pub fn config_path(app_data_dir: &Path) -> PathBuf {
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir.join("settings.json"),
    }
}

/// Initialize settings with the app data directory
pub fn init(app_data_dir: PathBuf) -> Settings {
    init_at(config_path(&app_data_dir))
}

/// Initialize settings from an explicit settings file
pub fn init_at(path: PathBuf) -> Settings {
    let settings = Settings::load(&path).with_env_overrides();
    tracing::info!(path = %path.display(), bind = %settings.bind_addr, "settings loaded");

    if let Ok(mut guard) = CONFIG_PATH.write() {
        *guard = Some(path);
    }
    if let Ok(mut guard) = SETTINGS.write() {
        *guard = Some(settings.clone());
    }
    settings
}

/// Current settings (defaults before `init`)
pub fn get() -> Settings {
    SETTINGS
        .read()
        .ok()
        .and_then(|g| g.clone())
        .unwrap_or_default()
}

/// Grade thresholds in force (default: 24 / 16 / 8)
pub fn get_thresholds() -> GradeThresholds {
    get().thresholds
}

/// Validate, save and set grade thresholds. Memory only changes once the
/// file is written.
pub fn set_thresholds(thresholds: GradeThresholds) -> Result<()> {
    thresholds.validate()?;

    let config_path = CONFIG_PATH
        .read()
        .map_err(|_| GradeError::Config("Failed to acquire config path lock".to_string()))?
        .clone()
        .ok_or_else(|| GradeError::Config("Settings not initialized".to_string()))?;

    let mut settings_guard = SETTINGS
        .write()
        .map_err(|_| GradeError::Config("Failed to acquire settings lock".to_string()))?;

    let mut updated = settings_guard.clone().unwrap_or_default();
    updated.thresholds = thresholds;
    updated.save(&config_path)?;
    *settings_guard = Some(updated);

    tracing::info!(
        high = thresholds.high,
        moderate = thresholds.moderate,
        low = thresholds.low,
        "grade thresholds saved"
    );
    Ok(())
}
