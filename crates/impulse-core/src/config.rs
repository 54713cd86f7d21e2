//! Player settings

use crate::{error::Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings shared by every session of a coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Allow sessions to move into the Picture-in-Picture window
    pub picture_in_picture_enabled: bool,
    /// Allow handing playback to a remote (cast) device
    pub cast_enabled: bool,
    /// Skip forward/backward step (seconds)
    pub seek_step_secs: f64,
    /// Periodic time observer interval requested from engines (milliseconds)
    pub progress_interval_ms: u64,
    /// Manifest request timeout (milliseconds)
    pub manifest_timeout_ms: u64,
    /// Per-session event bus capacity
    pub event_capacity: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            picture_in_picture_enabled: false,
            cast_enabled: true,
            seek_step_secs: 10.0,
            progress_interval_ms: 1000,
            manifest_timeout_ms: 30_000,
            event_capacity: 64,
        }
    }
}

impl PlayerSettings {
    /// Load settings from a JSON file and validate them
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: PlayerSettings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.seek_step_secs.is_finite() && self.seek_step_secs > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "seek_step_secs must be positive, got {}",
                self.seek_step_secs
            )));
        }
        if !(100..=10_000).contains(&self.progress_interval_ms) {
            return Err(Error::InvalidConfig(format!(
                "progress_interval_ms must be within 100..=10000, got {}",
                self.progress_interval_ms
            )));
        }
        if self.manifest_timeout_ms == 0 {
            return Err(Error::InvalidConfig("manifest_timeout_ms must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig("event_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_millis(self.manifest_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = PlayerSettings::default();
        assert!(settings.validate().is_ok());
        assert!(!settings.picture_in_picture_enabled);
        assert_eq!(settings.progress_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = PlayerSettings::from_json(r#"{ "picture_in_picture_enabled": true }"#).unwrap();
        assert!(settings.picture_in_picture_enabled);
        assert_eq!(settings.seek_step_secs, 10.0);
    }

    #[test]
    fn test_rejects_bad_interval() {
        let err = PlayerSettings::from_json(r#"{ "progress_interval_ms": 5 }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let settings = PlayerSettings {
            seek_step_secs: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
