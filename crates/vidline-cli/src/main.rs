//! Vidline CLI - Manifest and playback inspection tool
//!
//! Features:
//! - Segment timelines from HLS/DASH manifests
//! - Rendition ladders
//! - Buffered range normalization
//! - Stream type detection
//! - Live manifest monitoring
//! - Scripted playback state machine runs

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vidline_core::PlayerConfig;

mod commands;
mod output;

use output::OutputFormat;

/// Vidline CLI - streaming player core toolkit
#[derive(Parser)]
#[command(name = "vidline")]
#[command(version)]
#[command(about = "Inspect manifests, buffered ranges and playback state", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Player configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the segment timeline of a manifest (URL or file)
    Timeline {
        /// URL or path to manifest
        manifest: String,

        /// Highlight the segment containing this time (seconds)
        #[arg(short, long)]
        at: Option<f64>,

        /// Buffered ranges to mark, e.g. "0-12.5,20-30"
        #[arg(short, long)]
        buffered: Option<String>,
    },

    /// List the renditions declared by a multivariant playlist or MPD
    Renditions {
        /// URL or path to manifest
        manifest: String,
    },

    /// Normalize buffered ranges and compute buffer ahead
    Ranges {
        /// Ranges as "start-end" pairs, comma separated
        ranges: String,

        /// Playhead position in seconds
        #[arg(short, long, default_value = "0")]
        at: f64,
    },

    /// Detect stream type and container from a URL
    Detect {
        /// Media URL
        url: String,
    },

    /// Re-fetch a live manifest and report timeline changes
    Monitor {
        /// URL to manifest
        manifest: String,

        /// Refresh interval in seconds
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Duration to monitor (0 = indefinite)
        #[arg(short, long, default_value = "0")]
        duration: u64,
    },

    /// Feed a JSON script of commands and events through the state machine
    Simulate {
        /// Script file: array of {"command": ...} or {"event": ...} steps
        script: PathBuf,

        /// Playlist length for navigation commands
        #[arg(short, long, default_value = "0")]
        playlist: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
    vidline_core::init();

    let config = match &cli.config {
        Some(path) => PlayerConfig::from_file(path)?,
        None => PlayerConfig::default(),
    };
    tracing::debug!(?config, "Loaded player configuration");

    match cli.command {
        Commands::Timeline { manifest, at, buffered } => {
            commands::timeline(&manifest, at, buffered.as_deref(), &config, cli.format).await?;
        }
        Commands::Renditions { manifest } => {
            commands::renditions(&manifest, &config, cli.format).await?;
        }
        Commands::Ranges { ranges, at } => {
            commands::ranges(&ranges, at, &config, cli.format)?;
        }
        Commands::Detect { url } => {
            commands::detect(&url, cli.format)?;
        }
        Commands::Monitor { manifest, interval, duration } => {
            commands::monitor(&manifest, interval, duration, &config).await?;
        }
        Commands::Simulate { script, playlist } => {
            commands::simulate(&script, playlist, &config, cli.format)?;
        }
    }

    Ok(())
}
