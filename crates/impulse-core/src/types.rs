//! Core types for Impulse

use crate::error::PlaybackFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a playable item.
///
/// Two refs are equal when url, title, subtitle and headers all match; the
/// coordinator relies on this to decide between reusing and replacing state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoRef {
    url: Url,
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl VideoRef {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            title: None,
            subtitle: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

impl std::fmt::Display for VideoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{} ({})", title, self.url),
            None => write!(f, "{}", self.url),
        }
    }
}

/// Presenting host (the view controller a full-screen layer is shown from)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostId(pub u64);

/// A concrete embedding: a container inside a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceTarget {
    pub host: HostId,
    pub container: u64,
}

impl SurfaceTarget {
    pub fn new(host: u64, container: u64) -> Self {
        Self {
            host: HostId(host),
            container,
        }
    }
}

impl std::fmt::Display for SurfaceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "host {} / container {}", self.host.0, self.container)
    }
}

/// Engine-level playback state.
///
/// Only the coordinator moves between these; hosts read the derived
/// [`VideoState`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Unknown,
    Loading,
    Ready,
    Error(PlaybackFailure),
}

impl PlaybackState {
    pub fn video_state(&self) -> VideoState {
        match self {
            PlaybackState::Unknown | PlaybackState::Loading => VideoState::Loading,
            PlaybackState::Ready => VideoState::Ready,
            PlaybackState::Error(_) => VideoState::Error,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PlaybackState::Ready)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Unknown => write!(f, "unknown"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Error(cause) => write!(f, "error ({})", cause),
        }
    }
}

/// State exposed to hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoState {
    Loading,
    Ready,
    Error,
}

/// Selectable playback speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackRate {
    Quarter,
    Half,
    ThreeQuarters,
    #[default]
    Normal,
    OneAndQuarter,
    OneAndHalf,
    OneAndThreeQuarters,
    Double,
}

impl PlaybackRate {
    pub const ALL: [PlaybackRate; 8] = [
        PlaybackRate::Quarter,
        PlaybackRate::Half,
        PlaybackRate::ThreeQuarters,
        PlaybackRate::Normal,
        PlaybackRate::OneAndQuarter,
        PlaybackRate::OneAndHalf,
        PlaybackRate::OneAndThreeQuarters,
        PlaybackRate::Double,
    ];

    pub fn speed(&self) -> f32 {
        match self {
            PlaybackRate::Quarter => 0.25,
            PlaybackRate::Half => 0.5,
            PlaybackRate::ThreeQuarters => 0.75,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndQuarter => 1.25,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::OneAndThreeQuarters => 1.75,
            PlaybackRate::Double => 2.0,
        }
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.speed())
    }
}

/// A device a remote session can be started on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteDevice {
    pub id: String,
    pub friendly_name: Option<String>,
}

impl RemoteDevice {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            friendly_name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            friendly_name: Some(name.into()),
        }
    }
}

impl std::fmt::Display for RemoteDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.friendly_name.as_deref().unwrap_or("Unknown device"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_video_ref_equality_is_structural() {
        let a = VideoRef::new(url("https://cdn.example.com/a.m3u8")).with_title("A");
        let b = VideoRef::new(url("https://cdn.example.com/a.m3u8")).with_title("A");
        assert_eq!(a, b);

        let c = b.clone().with_header("Authorization", "Bearer x");
        assert_ne!(a, c);

        let d = VideoRef::new(url("https://cdn.example.com/a.m3u8")).with_subtitle("A");
        assert_ne!(a, d);
    }

    #[test]
    fn test_video_state_derivation() {
        assert_eq!(PlaybackState::Unknown.video_state(), VideoState::Loading);
        assert_eq!(PlaybackState::Loading.video_state(), VideoState::Loading);
        assert_eq!(PlaybackState::Ready.video_state(), VideoState::Ready);
        let failed = PlaybackState::Error(PlaybackFailure::new("LOAD", "boom"));
        assert_eq!(failed.video_state(), VideoState::Error);
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(PlaybackRate::Quarter.to_string(), "0.25x");
        assert_eq!(PlaybackRate::Normal.to_string(), "1x");
        assert_eq!(PlaybackRate::ALL.len(), 8);
    }

    #[test]
    fn test_remote_device_display() {
        assert_eq!(RemoteDevice::new("abc").to_string(), "Unknown device");
        assert_eq!(RemoteDevice::named("abc", "Living Room").to_string(), "Living Room");
    }
}
