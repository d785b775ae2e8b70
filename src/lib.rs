use std::path::PathBuf;
use std::sync::Arc;
use serde::Serialize;

pub mod analyzers;
pub mod audio;
pub mod bench;
pub mod cli;
pub mod progress;
pub mod utils;

/// Dense index assigned to a track at import time.
pub type TrackId = usize;

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub id: TrackId,
    pub name: String,
    pub path: PathBuf,
    /// Decoded mono samples, shared read-only across workers.
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
    /// Position on the master timeline, assigned by offset reconciliation.
    pub offset_secs: Option<f64>,
}

impl AudioTrack {
    pub fn new(
        id: TrackId,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        samples: Vec<f32>,
        sample_rate: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            samples: Arc::new(samples),
            sample_rate,
            offset_secs: None,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// One hash anchored at a point in time within a track. Equal hashes across
/// tracks are the matching mechanism, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fingerprint {
    pub hash: u32,
    pub time_secs: f64,
}

/// Evidence that two tracks carry the same content at the given timestamps.
/// Invariant: track1 < track2.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Match {
    pub track1: TrackId,
    pub track2: TrackId,
    pub track1_time: f64,
    pub track2_time: f64,
    pub similarity: f64,
}

impl Match {
    /// Offset of track2 relative to track1 on the master timeline.
    pub fn offset_secs(&self) -> f64 {
        self.track1_time - self.track2_time
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Audio decoding error: {0}")]
    Decode(String),
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AlignError>;

// Re-exports for convenience
pub use analyzers::aligner::{assign_offsets, AlignOutcome, Aligner, AlignmentResult, TrackFailure};
pub use analyzers::fingerprint::{FingerprintConfig, FingerprintExtractor};
pub use analyzers::index::FingerprintIndex;
pub use analyzers::matcher::{MatchConfig, Matcher};
pub use audio::decode::TrackImporter;
pub use bench::{run_benchmark, BenchmarkEntry};
pub use progress::{ProgressEvent, ProgressMonitor, ProgressReporter};
pub use utils::cancel::CancellationToken;
