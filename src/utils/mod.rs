//! Utility module for TuneFlow
//!
//! This module provides common utilities used throughout the application:
//! - Error handling with custom error types
//! - Configuration management
//! - Cancellable session timers
//! - Time formatting helpers

pub mod config;
pub mod error;
pub mod timer;

// Re-export commonly used items
pub use config::{AdDetectorConfig, CatalogConfig, Config, GeneralConfig, PlaybackConfig};
pub use error::{Result, TuneFlowError};
pub use timer::{ManualScheduler, Scheduler, TimerKind, TimerSlot, TokioScheduler};

/// Initialize the application configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. System configuration file
/// 3. User configuration file
/// 4. Environment variables
pub fn load_config() -> Result<Config> {
    Config::load()
}

/// Format a position in seconds as `m:ss`
///
/// Minutes are not padded and keep counting past the hour (`75:02`).
/// Zero, negative and non-finite inputs render as `0:00`.
pub fn format_clock(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "0:00".to_string();
    }

    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Progress as a percentage in `0..=100`, or 0 while the duration is unknown
pub fn progress_percent(current: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    (current / duration * 100.0).clamp(0.0, 100.0)
}
