use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "track_aligner")]
#[command(version = "1.0")]
#[command(about = "Synchronizes independently recorded audio tracks by acoustic fingerprinting", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect shared content across tracks and assign timeline offsets
    Align {
        /// Directories to scan for audio tracks
        #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output CSV report path
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Analysis window length in samples
        #[arg(long, default_value_t = 2048)]
        window_size: usize,

        /// Samples between analysis windows
        #[arg(long, default_value_t = 1024)]
        hop_size: usize,

        /// Offset histogram bucket width in seconds
        #[arg(long, default_value_t = 0.05)]
        bucket_width: f64,

        /// Minimum corroborating fingerprints per reported match
        #[arg(long, default_value_t = 4)]
        min_votes: usize,

        /// Discard matches below this similarity
        #[arg(long, default_value_t = 0.05)]
        min_similarity: f64,

        /// Only print results without writing the report
        #[arg(short = 'd', long)]
        dry_run: bool,
    },

    /// Time fingerprint extractor variants over a set of tracks
    Bench {
        /// Directory to scan for audio tracks
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Output CSV file path
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
}
