//! Error types for TuneFlow
//!
//! This module defines the error type shared by every component. Errors in the
//! playback core are logged and swallowed at the session boundary; only the
//! catalog, favorites and configuration layers hand them back to callers.

use thiserror::Error;

/// Main error type for TuneFlow
#[derive(Error, Debug)]
pub enum TuneFlowError {
    /// A command arrived before the embedded player signalled readiness
    #[error("Embedded player is not ready")]
    AdapterNotReady,

    /// A platform capability (media surface, audio graph) is absent or partial
    #[error("Platform unsupported: {0}")]
    PlatformUnsupported(String),

    /// Embedded player errors
    #[error("Player adapter error: {0}")]
    Adapter(String),

    /// Audio graph errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Media control surface errors
    #[error("Media surface error: {0}")]
    MediaSurface(String),

    /// Catalog search errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for TuneFlowError {
    fn from(err: reqwest::Error) -> Self {
        TuneFlowError::Catalog(format!("HTTP error: {}", err))
    }
}

impl TuneFlowError {
    /// Whether this error only means a platform capability is missing.
    ///
    /// Call sites use this to skip silently instead of logging a warning.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TuneFlowError::PlatformUnsupported(_))
    }
}

/// Convenience type alias for Results in TuneFlow
pub type Result<T> = std::result::Result<T, TuneFlowError>;

/// Extension trait for converting other errors to TuneFlowError
pub trait IntoTuneFlowError<T> {
    /// Convert this error into a TuneFlowError with the given context
    fn audio_err(self, context: &str) -> Result<T>;
    fn catalog_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoTuneFlowError<T> for std::result::Result<T, E> {
    fn audio_err(self, context: &str) -> Result<T> {
        self.map_err(|e| TuneFlowError::Audio(format!("{}: {}", context, e)))
    }

    fn catalog_err(self, context: &str) -> Result<T> {
        self.map_err(|e| TuneFlowError::Catalog(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| TuneFlowError::Config(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TuneFlowError::AdapterNotReady;
        assert_eq!(err.to_string(), "Embedded player is not ready");

        let err = TuneFlowError::PlatformUnsupported("media session".to_string());
        assert_eq!(err.to_string(), "Platform unsupported: media session");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: TuneFlowError = io_err.into();
        assert!(matches!(err, TuneFlowError::FileIO(_)));

        let json_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: TuneFlowError = json_err.into();
        assert!(matches!(err, TuneFlowError::Serialization(_)));
    }

    #[test]
    fn test_is_unsupported() {
        assert!(TuneFlowError::PlatformUnsupported("seekto".into()).is_unsupported());
        assert!(!TuneFlowError::MediaSurface("rejected".into()).is_unsupported());
    }

    #[test]
    fn test_into_tuneflow_error_trait() {
        let result: std::result::Result<(), &str> = Err("device busy");
        let converted = result.audio_err("Opening output stream");

        match converted {
            Err(TuneFlowError::Audio(msg)) => {
                assert_eq!(msg, "Opening output stream: device busy");
            }
            _ => panic!("Expected Audio error"),
        }
    }
}
