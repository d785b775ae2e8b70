use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::analyzers::index::FingerprintIndex;
use crate::{Fingerprint, Match, TrackId};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Width of one offset histogram bucket; absorbs timing jitter between
    /// the two recordings.
    pub bucket_width_secs: f64,
    /// Minimum corroborating votes in the dominant bucket before a pair
    /// yields a Match at all.
    pub min_votes: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            bucket_width_secs: 0.05,
            min_votes: 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BucketStats {
    votes: usize,
    /// Earliest vote: (time in the indexed track, time in the queried track).
    first: (f64, f64),
}

/// Converts raw hash collisions into scored, offset-estimated matches.
///
/// Each collision between the queried track and an already indexed one votes
/// for a time delta; the dominant delta bucket per pair becomes the offset
/// estimate, and the vote ratio becomes the similarity. Accidental hash
/// collisions between unrelated content scatter across buckets and fall
/// under the vote threshold.
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Match `track`'s fingerprints against everything already in the index.
    ///
    /// `fingerprint_counts` holds per-track fingerprint totals indexed by
    /// TrackId; similarity is dominant votes over the smaller of the two
    /// tracks' totals, clamped to [0, 1]. The representative timestamps of a
    /// match are the dominant bucket's earliest vote. Ties between buckets
    /// go to the delta closest to zero, then to the negative one.
    pub fn match_against_index(
        &self,
        track: TrackId,
        fingerprints: &[Fingerprint],
        index: &FingerprintIndex,
        fingerprint_counts: &[usize],
    ) -> Vec<Match> {
        let width = self.config.bucket_width_secs.max(f64::EPSILON);

        let mut histograms: HashMap<(TrackId, i64), BucketStats> = HashMap::new();
        for fingerprint in fingerprints {
            for &(other, other_time) in index.lookup(fingerprint.hash) {
                if other == track {
                    continue;
                }
                let delta = fingerprint.time_secs - other_time;
                let bucket = (delta / width).round() as i64;
                histograms
                    .entry((other, bucket))
                    .and_modify(|stats| stats.votes += 1)
                    .or_insert(BucketStats {
                        votes: 1,
                        first: (other_time, fingerprint.time_secs),
                    });
            }
        }

        // Reduce to the dominant bucket per pair. The comparator is a total
        // order, so the winner does not depend on map iteration order.
        let mut dominant: HashMap<TrackId, (i64, BucketStats)> = HashMap::new();
        for ((other, bucket), stats) in histograms {
            match dominant.entry(other) {
                Entry::Vacant(slot) => {
                    slot.insert((bucket, stats));
                }
                Entry::Occupied(mut slot) => {
                    let best = slot.get_mut();
                    if bucket_wins(bucket, stats.votes, best.0, best.1.votes) {
                        *best = (bucket, stats);
                    }
                }
            }
        }

        let track_count = fingerprint_counts.get(track).copied().unwrap_or(0);
        let mut matches = Vec::new();
        for (other, (_bucket, stats)) in dominant {
            if stats.votes < self.config.min_votes {
                log::debug!(
                    "pair ({}, {}): dominant bucket has {} votes, below threshold {}",
                    other,
                    track,
                    stats.votes,
                    self.config.min_votes
                );
                continue;
            }
            let other_count = fingerprint_counts.get(other).copied().unwrap_or(0);
            let denom = track_count.min(other_count).max(1);
            let similarity = (stats.votes as f64 / denom as f64).clamp(0.0, 1.0);

            let (track1, track2, track1_time, track2_time) = if other < track {
                (other, track, stats.first.0, stats.first.1)
            } else {
                (track, other, stats.first.1, stats.first.0)
            };
            matches.push(Match {
                track1,
                track2,
                track1_time,
                track2_time,
                similarity,
            });
        }

        sort_matches(&mut matches);
        matches
    }
}

/// True if bucket `a` beats bucket `b`: more votes, else closer to zero
/// delta, else the smaller bucket key.
fn bucket_wins(a: i64, a_votes: usize, b: i64, b_votes: usize) -> bool {
    match a_votes.cmp(&b_votes) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match a.abs().cmp(&b.abs()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a < b,
        },
    }
}

/// Descending similarity, then pair order. One match per pair makes this a
/// total order, so the result is identical across runs.
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (a.track1, a.track2).cmp(&(b.track1, b.track2)))
    });
}
