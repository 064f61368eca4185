use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Run a single action instead of the interactive menu
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify tools, API keys, and output directories
    Check,

    /// Download the video attached to a tweet
    Fetch {
        /// Tweet URL
        #[arg(short, long)]
        url: Option<String>,

        /// Output directory (defaults to downloads/)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Extract the audio track from a local video file
    Extract {
        /// Input video file (defaults to the latest download)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output audio file (defaults to the input with an .mp3 extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send a local video to the dubbing service, poll, and save the result
    Dub {
        /// Input video file (defaults to the latest download)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Target language: short code, locale, or name (e.g. "fr", "fr_FR", "French")
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Run the full backend dubbing flow through the local emulator
    Flow {
        /// Tweet URL
        #[arg(short, long)]
        url: Option<String>,

        /// Target language: short code, locale, or name
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Show recent backend function logs
    Logs,

    /// Check (and optionally start) the local emulator
    Emulator,

    /// Show the current configuration
    Config,
}
