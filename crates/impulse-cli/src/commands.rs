//! CLI command implementations

use crate::output::{to_json, OutputFormat};
use anyhow::Context;
use bytes::Bytes;
use impulse_core::manifest::qualities_from_bytes;
use impulse_core::{Error, HttpFetch, PlayerSettings, ReqwestFetcher, VideoQuality};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Serialize)]
struct QualityRow {
    label: String,
    bitrate: f64,
    definition: String,
}

impl From<&VideoQuality> for QualityRow {
    fn from(quality: &VideoQuality) -> Self {
        Self {
            label: quality.to_string(),
            bitrate: quality.bitrate,
            definition: format!("{:?}", quality.definition()),
        }
    }
}

#[derive(Debug, Serialize)]
struct QualityReport {
    source: String,
    /// Variant count from the strict parse, when requested
    variants: Option<usize>,
    qualities: Vec<QualityRow>,
}

/// List the qualities a viewer would be offered
pub async fn qualities(
    manifest: &str,
    strict: bool,
    timeout_ms: Option<u64>,
    format: &str,
) -> anyhow::Result<()> {
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| PlayerSettings::default().manifest_timeout());
    let body = load_manifest(manifest, timeout).await?;

    let variants = if strict {
        Some(strict_variant_count(&body)?)
    } else {
        None
    };

    let qualities = qualities_from_bytes(&body);
    info!(source = manifest, count = qualities.len(), "Qualities extracted");

    let report = QualityReport {
        source: manifest.to_string(),
        variants,
        qualities: qualities.iter().map(QualityRow::from).collect(),
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&report)),
        OutputFormat::Text => {
            println!("Manifest: {}", report.source);
            if let Some(variants) = report.variants {
                println!("  Well-formed master playlist, {} variants", variants);
            }
            println!("\nQualities:");
            for (i, row) in report.qualities.iter().enumerate() {
                if row.bitrate > 0.0 {
                    println!("  {}. {} - {}bps ({})", i + 1, row.label, row.bitrate, row.definition);
                } else {
                    println!("  {}. {}", i + 1, row.label);
                }
            }
        }
    }

    Ok(())
}

/// Print the default settings, or validate and print a settings file
pub fn settings(file: Option<PathBuf>, format: &str) -> anyhow::Result<()> {
    let settings = match &file {
        Some(path) => PlayerSettings::from_file(path)
            .with_context(|| format!("Invalid settings file {}", path.display()))?,
        None => PlayerSettings::default(),
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&settings)),
        OutputFormat::Text => {
            match &file {
                Some(path) => println!("Settings file {} is valid", path.display()),
                None => println!("Default settings"),
            }
            println!("  Picture in Picture: {}", settings.picture_in_picture_enabled);
            println!("  Cast: {}", settings.cast_enabled);
            println!("  Seek step: {}s", settings.seek_step_secs);
            println!("  Progress interval: {}ms", settings.progress_interval_ms);
            println!("  Manifest timeout: {}ms", settings.manifest_timeout_ms);
            println!("  Event capacity: {}", settings.event_capacity);
        }
    }

    Ok(())
}

async fn load_manifest(source: &str, timeout: Duration) -> anyhow::Result<Bytes> {
    match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            debug!(url = %url, "Fetching manifest");
            let fetcher = ReqwestFetcher::new(timeout)?;
            Ok(fetcher.fetch(&url, &BTreeMap::new()).await?)
        }
        _ => {
            debug!(path = source, "Reading manifest");
            let body = tokio::fs::read(source)
                .await
                .with_context(|| format!("Cannot read {}", source))?;
            Ok(Bytes::from(body))
        }
    }
}

/// Parse with m3u8-rs, which rejects a playlist outright instead of
/// skipping bad lines
fn strict_variant_count(body: &[u8]) -> anyhow::Result<usize> {
    if std::str::from_utf8(body).is_err() {
        return Err(Error::ManifestEncoding.into());
    }
    match m3u8_rs::parse_master_playlist_res(body) {
        Ok(master) => Ok(master.variants.len()),
        Err(e) => anyhow::bail!("Not a well-formed master playlist: {:?}", e),
    }
}
