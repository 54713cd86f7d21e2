//! HLS manifest quality extraction
//!
//! Turns a multivariant playlist into the list of qualities a viewer can pick
//! from. Fetching is fallible, parsing is not: every failure degrades to the
//! lone [`VideoQuality::automatic`] entry.

mod fetch;
mod hls;

pub use fetch::{HttpFetch, ReqwestFetcher};
pub use hls::parse_qualities;

use crate::types::VideoRef;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A selectable video quality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoQuality {
    /// Peak bandwidth in bits per second (0 for automatic)
    pub bitrate: f64,
    /// Height-based label such as `720p`
    pub resolution: String,
}

impl VideoQuality {
    /// Label of the automatic sentinel
    pub const AUTOMATIC_LABEL: &'static str = "Automatic";

    pub fn new(bitrate: f64, resolution: impl Into<String>) -> Self {
        Self {
            bitrate,
            resolution: resolution.into(),
        }
    }

    /// Sentinel that lets the engine pick
    pub fn automatic() -> Self {
        Self::new(0.0, Self::AUTOMATIC_LABEL)
    }

    pub fn is_automatic(&self) -> bool {
        *self == Self::automatic()
    }

    /// Quality tier used for badges
    pub fn definition(&self) -> QualityDefinition {
        if self.is_automatic() {
            return QualityDefinition::Auto;
        }
        match self.resolution.as_str() {
            "480p" => QualityDefinition::Sd,
            "720p" => QualityDefinition::Hd,
            "1080p" => QualityDefinition::Fhd,
            "2160p" => QualityDefinition::TwoK,
            "4320p" => QualityDefinition::FourK,
            other => QualityDefinition::Custom(other.to_string()),
        }
    }
}

impl Default for VideoQuality {
    fn default() -> Self {
        Self::automatic()
    }
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resolution)
    }
}

/// Quality tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityDefinition {
    Auto,
    Sd,
    Hd,
    Fhd,
    TwoK,
    FourK,
    Custom(String),
}

/// Parse raw manifest bytes, degrading to `[Automatic]` on bad encoding
pub fn qualities_from_bytes(body: &[u8]) -> Vec<VideoQuality> {
    match std::str::from_utf8(body) {
        Ok(text) => parse_qualities(text),
        Err(_) => {
            warn!("Manifest is not valid UTF-8, offering automatic quality only");
            vec![VideoQuality::automatic()]
        }
    }
}

/// Fetch and parse the manifest of `video`.
///
/// Never fails: a fetch error yields `[Automatic]`.
pub async fn fetch_qualities(fetcher: &dyn HttpFetch, video: &VideoRef) -> Vec<VideoQuality> {
    match fetcher.fetch(video.url(), video.headers()).await {
        Ok(body) => {
            let qualities = qualities_from_bytes(&body);
            debug!(url = %video.url(), count = qualities.len(), "Manifest qualities loaded");
            qualities
        }
        Err(e) => {
            warn!(url = %video.url(), error = %e, "Manifest fetch failed");
            vec![VideoQuality::automatic()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::BTreeMap;
    use url::Url;

    struct StaticFetch(Option<&'static [u8]>);

    #[async_trait]
    impl HttpFetch for StaticFetch {
        async fn fetch(&self, _url: &Url, _headers: &BTreeMap<String, String>) -> Result<Bytes> {
            match self.0 {
                Some(body) => Ok(Bytes::from_static(body)),
                None => Err(Error::ManifestFetch("404".into())),
            }
        }
    }

    fn video() -> VideoRef {
        VideoRef::new(Url::parse("https://cdn.example.com/master.m3u8").unwrap())
    }

    #[test]
    fn test_definition_tiers() {
        assert_eq!(VideoQuality::automatic().definition(), QualityDefinition::Auto);
        assert_eq!(VideoQuality::new(1e6, "720p").definition(), QualityDefinition::Hd);
        assert_eq!(VideoQuality::new(9e6, "2160p").definition(), QualityDefinition::TwoK);
        assert_eq!(
            VideoQuality::new(3e5, "360p").definition(),
            QualityDefinition::Custom("360p".into())
        );
    }

    #[test]
    fn test_equality_needs_bitrate_and_resolution() {
        assert_eq!(VideoQuality::new(1e6, "720p"), VideoQuality::new(1e6, "720p"));
        assert_ne!(VideoQuality::new(1e6, "720p"), VideoQuality::new(2e6, "720p"));
        assert_ne!(VideoQuality::new(1e6, "720p"), VideoQuality::new(1e6, "1080p"));
    }

    #[test]
    fn test_invalid_utf8_degrades() {
        assert_eq!(qualities_from_bytes(&[0xff, 0xfe, 0x00]), vec![VideoQuality::automatic()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_automatic() {
        let qualities = fetch_qualities(&StaticFetch(None), &video()).await;
        assert_eq!(qualities, vec![VideoQuality::automatic()]);
    }

    #[tokio::test]
    async fn test_fetch_success_parses() {
        let body: &'static [u8] =
            b"#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n360p.m3u8\n";
        let qualities = fetch_qualities(&StaticFetch(Some(body)), &video()).await;
        assert_eq!(
            qualities,
            vec![VideoQuality::automatic(), VideoQuality::new(800_000.0, "360p")]
        );
    }
}
