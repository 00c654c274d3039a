//! Configuration file support for GlomerAlign.
//!
//! Settings are stored as versioned JSON. Files written by a newer version
//! of the crate are rejected rather than half-understood.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::AutoSaver;
use crate::matching::EngineOptions;
use crate::state::ThresholdSegmenter;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    pub preferences: UserPreferences,

    #[serde(default)]
    pub auto_save: AutoSaveConfig,

    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

fn default_app_name() -> String {
    "GlomerAlign".to_string()
}

fn default_true() -> bool {
    true
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Default session folder path
    #[serde(default)]
    pub session_folder: String,

    /// Commit as soon as both sides have a pending pick
    #[serde(default = "default_true")]
    pub auto_commit: bool,

    /// Refresh only the changed labels of an overlay
    #[serde(default = "default_true")]
    pub incremental_overlays: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            session_folder: String::new(),
            auto_commit: true,
            incremental_overlays: true,
        }
    }
}

/// Auto-save timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Quiet period after the last change before saving
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
    /// Minimum time between two saves
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_debounce_secs() -> u64 {
    AutoSaver::DEFAULT_DEBOUNCE_DELAY.as_secs()
}

fn default_interval_secs() -> u64 {
    AutoSaver::DEFAULT_SAVE_INTERVAL.as_secs()
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_secs: default_debounce_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// Parameters of the built-in threshold segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Smaller components are discarded
    #[serde(default = "default_min_voxels")]
    pub min_voxels: usize,
}

fn default_threshold() -> f32 {
    0.5
}

fn default_min_voxels() -> usize {
    8
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_voxels: default_min_voxels(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            auto_save: AutoSaveConfig::default(),
            segmentation: SegmentationConfig::default(),
        }
    }

    /// Engine switches taken from the preferences.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            auto_commit: self.preferences.auto_commit,
            incremental_overlays: self.preferences.incremental_overlays,
        }
    }

    /// Auto-saver for `dir` configured from the `auto_save` section.
    pub fn auto_saver(&self, dir: impl Into<PathBuf>) -> AutoSaver {
        let mut saver = AutoSaver::new(dir)
            .with_debounce_delay(Duration::from_secs(self.auto_save.debounce_secs))
            .with_save_interval(Duration::from_secs(self.auto_save.interval_secs));
        saver.set_enabled(self.auto_save.enabled);
        saver
    }

    /// Threshold segmenter configured from the `segmentation` section.
    pub fn segmenter(&self) -> ThresholdSegmenter {
        ThresholdSegmenter::new(self.segmentation.threshold)
            .with_min_voxels(self.segmentation.min_voxels)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "glomeralign-config.json"
    }

    /// Get the default config file path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("glomeralign").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("glomeralign")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from `path`.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_file(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to_file(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Neither a config nor a home directory could be determined
    #[error("Could not determine config directory")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = AppConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let json = r#"{"version":1,"preferences":{"log_level":"debug","auto_commit":false}}"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.app_name, "GlomerAlign");
        assert_eq!(config.preferences.log_level, LogLevel::Debug);
        assert!(config.preferences.incremental_overlays);
        assert_eq!(config.auto_save, AutoSaveConfig::default());

        let options = config.engine_options();
        assert!(!options.auto_commit);
        assert!(options.incremental_overlays);
    }

    #[test]
    fn test_newer_version_rejected() {
        let json = format!(
            r#"{{"version":{},"preferences":{{}}}}"#,
            CONFIG_VERSION + 1
        );
        assert!(matches!(
            AppConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { .. })
        ));
    }

    #[test]
    fn test_auto_saver_from_config() {
        let mut config = AppConfig::default();
        config.auto_save.enabled = false;
        let saver = config.auto_saver("/tmp/session");
        assert!(!saver.is_enabled());
        assert_eq!(saver.dir(), std::path::Path::new("/tmp/session"));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("glomeralign_config_{}", std::process::id()))
            .join(AppConfig::default_filename());
        let mut config = AppConfig::default();
        config.preferences.session_folder = "/data/sessions".into();
        config.segmentation.min_voxels = 3;

        config.save_to_file(&path).unwrap();
        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.segmenter().min_voxels, 3);
    }
}
