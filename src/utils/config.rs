//! Configuration management for TuneFlow
//!
//! This module handles loading and managing application configuration
//! from config files and environment variables.

use crate::utils::error::{IntoTuneFlowError, Result, TuneFlowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Playback lifecycle settings
    pub playback: PlaybackConfig,

    /// Ad heuristic settings
    pub ad_detector: AdDetectorConfig,

    /// Catalog search settings
    pub catalog: CatalogConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Playback lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Progress ticker period in milliseconds
    pub progress_interval_ms: u64,

    /// Elapsed seconds after which "previous" restarts the current track
    pub previous_restart_threshold_secs: f64,

    /// Delay before reconciling playback after returning to the foreground
    pub visibility_settle_ms: u64,

    /// Album label shown on the system media surface
    pub album_label: String,

    /// Artwork used when a track carries no thumbnail
    pub fallback_artwork_url: String,

    /// Loop a silent stream so the platform keeps the audio session alive
    pub keep_alive: bool,
}

/// Ad heuristic detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdDetectorConfig {
    /// Enable the detector
    pub enabled: bool,

    /// Poll period in milliseconds
    pub poll_interval_ms: u64,

    /// Clips shorter than this many seconds are treated as ads
    pub max_ad_duration_secs: f64,

    /// Skip attempts tolerated per window before abandoning the track
    pub max_skip_attempts: u32,

    /// Consecutive unstarted polls tolerated before forcing play
    pub max_unstarted_polls: u32,

    /// How far before the end of an ad the skip seek lands
    pub end_seek_offset_secs: f64,
}

/// Catalog search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// YouTube Data API key
    pub api_key: Option<String>,

    /// Search endpoint
    pub endpoint: String,

    /// Results per search (1-50)
    pub max_results: u32,

    /// Text appended to every query
    pub query_suffix: String,

    /// Video category filter
    pub category_id: String,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Favorites file override
    pub favorites_file: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 500,
            previous_restart_threshold_secs: 3.0,
            visibility_settle_ms: 300,
            album_label: "TuneFlow".to_string(),
            fallback_artwork_url: "https://i.ytimg.com/img/no_thumbnail.jpg".to_string(),
            keep_alive: true,
        }
    }
}

impl Default for AdDetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 700, // ~1.4 Hz
            max_ad_duration_secs: 35.0,
            max_skip_attempts: 4,
            max_unstarted_polls: 3,
            end_seek_offset_secs: 0.1,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://www.googleapis.com/youtube/v3/search".to_string(),
            max_results: 15,
            query_suffix: " official audio".to_string(),
            category_id: "10".to_string(), // Music
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            favorites_file: None,
        }
    }
}

impl PlaybackConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn visibility_settle(&self) -> Duration {
        Duration::from_millis(self.visibility_settle_ms)
    }
}

impl AdDetectorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/tuneflow/config.toml on Linux)
    /// 3. User config file (~/.config/tuneflow/config.toml on Linux)
    /// 4. Environment variables (TUNEFLOW_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config = Self::from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config = Self::from_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Read a single TOML file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .config_err("Failed to read config file")?;

        toml::from_str(&contents).config_err("Failed to parse config file")
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()
            .ok_or_else(|| TuneFlowError::Config("Cannot determine user config path".to_string()))?;
        self.save_to(&path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).config_err("Failed to serialize config")?;
        std::fs::write(path, toml).config_err("Failed to write config file")?;

        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(key) = std::env::var("TUNEFLOW_API_KEY") {
            if !key.trim().is_empty() {
                self.catalog.api_key = Some(key);
            }
        }

        if let Ok(level) = std::env::var("TUNEFLOW_LOG_LEVEL") {
            self.general.log_level = level;
        }

        if let Ok(value) = std::env::var("TUNEFLOW_AD_DETECTOR") {
            self.ad_detector.enabled = parse_flag(&value)
                .ok_or_else(|| TuneFlowError::Config("Invalid TUNEFLOW_AD_DETECTOR".to_string()))?;
        }

        if let Ok(value) = std::env::var("TUNEFLOW_KEEP_ALIVE") {
            self.playback.keep_alive = parse_flag(&value)
                .ok_or_else(|| TuneFlowError::Config("Invalid TUNEFLOW_KEEP_ALIVE".to_string()))?;
        }

        if let Ok(value) = std::env::var("TUNEFLOW_MAX_RESULTS") {
            self.catalog.max_results = value.parse()
                .map_err(|_| TuneFlowError::Config("Invalid TUNEFLOW_MAX_RESULTS".to_string()))?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.playback.progress_interval_ms == 0 || self.ad_detector.poll_interval_ms == 0 {
            return Err(TuneFlowError::Config("Polling intervals must be non-zero".to_string()));
        }

        if self.playback.previous_restart_threshold_secs < 0.0 {
            return Err(TuneFlowError::Config(
                "Previous-track restart threshold must not be negative".to_string(),
            ));
        }

        if self.ad_detector.max_ad_duration_secs <= 0.0 || self.ad_detector.end_seek_offset_secs <= 0.0 {
            return Err(TuneFlowError::Config("Ad detector thresholds must be positive".to_string()));
        }

        if !(1..=50).contains(&self.catalog.max_results) {
            return Err(TuneFlowError::Config("max_results must be between 1 and 50".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(TuneFlowError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level,
                valid_log_levels
            )));
        }

        Ok(())
    }

    /// Resolved favorites file location
    pub fn favorites_path(&self) -> PathBuf {
        self.general.favorites_file.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tuneflow")
                .join("favorites.json")
        })
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/tuneflow/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA").ok()
            .map(|p| PathBuf::from(p).join("TuneFlow").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/TuneFlow/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tuneflow").join("config.toml"))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
