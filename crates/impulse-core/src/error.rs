//! Error types for Impulse Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Manifest errors
    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Manifest is not valid UTF-8")]
    ManifestEncoding,

    // Engine errors
    #[error("Failed to construct playback engine: {0}")]
    EngineConstruction(String),

    #[error("Failed to load video: {0}")]
    Load(String),

    // Remote playback errors
    #[error("Remote session failed: {0}")]
    RemoteConnect(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ManifestFetch(_)
                | Error::Load(_)
                | Error::RemoteConnect(_)
                | Error::Network(_)
        )
    }

    /// Returns the error code reported to observers
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::ManifestEncoding => "MANIFEST_ENCODING",
            Error::EngineConstruction(_) => "ENGINE_CONSTRUCTION",
            Error::Load(_) => "LOAD",
            Error::RemoteConnect(_) => "REMOTE_CONNECT",
            Error::Network(_) => "NETWORK",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }
}

/// Cloneable failure value carried by observable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFailure {
    pub code: String,
    pub message: String,
}

impl PlaybackFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&Error> for PlaybackFailure {
    fn from(err: &Error) -> Self {
        Self::new(err.error_code(), err.to_string())
    }
}

impl From<Error> for PlaybackFailure {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for PlaybackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_from_error() {
        let failure = PlaybackFailure::from(Error::Load("timed out".into()));
        assert_eq!(failure.code, "LOAD");
        assert_eq!(failure.message, "Failed to load video: timed out");
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::RemoteConnect("gone".into()).is_recoverable());
        assert!(!Error::InvalidConfig("bad".into()).is_recoverable());
    }
}
