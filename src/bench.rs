use std::time::{Duration, Instant};

use serde::Serialize;

use crate::analyzers::fingerprint::{FingerprintConfig, FingerprintExtractor};
use crate::AudioTrack;

/// One timed extraction of one track with one named algorithm variant.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkEntry {
    pub track: String,
    pub variant: String,
    pub hash_count: usize,
    pub elapsed: Duration,
}

/// The built-in variant set: the default granularity plus coarser and denser
/// window/hop pairings of the same band-difference algorithm.
pub fn default_variants() -> Vec<(String, FingerprintConfig)> {
    let mut variants = Vec::new();
    for (window_size, hop_size) in [(4096, 2048), (2048, 1024), (1024, 512), (2048, 512)] {
        let config = FingerprintConfig {
            window_size,
            hop_size,
            ..FingerprintConfig::default()
        };
        variants.push((format!("band-diff-{}/{}", window_size, hop_size), config));
    }
    variants
}

/// Run every variant over every track, recording hash counts and wall time.
/// A variant that rejects a track (degenerate config for that input) is
/// logged and skipped; the other entries are still produced.
pub fn run_benchmark(
    tracks: &[AudioTrack],
    variants: &[(String, FingerprintConfig)],
) -> Vec<BenchmarkEntry> {
    let mut entries = Vec::new();
    for track in tracks {
        for (name, config) in variants {
            let extractor = FingerprintExtractor::new(config.clone());
            let start = Instant::now();
            match extractor.extract(&track.samples, track.sample_rate) {
                Ok(fingerprints) => {
                    let elapsed = start.elapsed();
                    log::info!(
                        "benchmark {} / {}: {} hashes in {:.3}s",
                        track.name,
                        name,
                        fingerprints.len(),
                        elapsed.as_secs_f64()
                    );
                    entries.push(BenchmarkEntry {
                        track: track.name.clone(),
                        variant: name.clone(),
                        hash_count: fingerprints.len(),
                        elapsed,
                    });
                }
                Err(e) => {
                    log::warn!("benchmark {} / {} failed: {}", track.name, name, e);
                }
            }
        }
    }
    entries
}
