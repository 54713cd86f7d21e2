//! Impulse CLI - manifest and settings inspection
//!
//! Features:
//! - List the qualities a viewer would be offered for an HLS master playlist
//! - Strict master playlist well-formedness check
//! - Print or validate player settings files

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Impulse CLI - playback toolkit
#[derive(Parser)]
#[command(name = "impulse-cli")]
#[command(version)]
#[command(about = "Inspect HLS qualities and Impulse Player settings", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List selectable qualities of a master playlist
    Qualities {
        /// URL or path to manifest
        manifest: String,

        /// Fail unless the playlist is a well-formed master playlist
        #[arg(long)]
        strict: bool,

        /// Request timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Print default settings, or validate a settings file
    Settings {
        /// Settings file (JSON)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();
    impulse_core::init();

    match cli.command {
        Commands::Qualities {
            manifest,
            strict,
            timeout_ms,
        } => {
            commands::qualities(&manifest, strict, timeout_ms, &cli.format).await?;
        }
        Commands::Settings { file } => {
            commands::settings(file, &cli.format)?;
        }
    }

    Ok(())
}
