use std::collections::HashMap;

use crate::{Fingerprint, TrackId};

/// Inverted index from fingerprint hash to every (track, time) occurrence
/// seen so far. Grows monotonically over one alignment run and is rebuilt
/// for the next; a cancelled run's index is dropped, never reused.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    buckets: HashMap<u32, Vec<(TrackId, f64)>>,
    len: usize,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track: TrackId, fingerprint: &Fingerprint) {
        self.buckets
            .entry(fingerprint.hash)
            .or_default()
            .push((track, fingerprint.time_secs));
        self.len += 1;
    }

    pub fn insert_all(&mut self, track: TrackId, fingerprints: &[Fingerprint]) {
        for fingerprint in fingerprints {
            self.insert(track, fingerprint);
        }
    }

    /// Occurrences sharing this hash, in insertion order.
    pub fn lookup(&self, hash: u32) -> &[(TrackId, f64)] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct hashes.
    pub fn hash_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of stored occurrences.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}
