use rayon::prelude::*;

use crate::analyzers::fingerprint::{FingerprintConfig, FingerprintExtractor};
use crate::analyzers::index::FingerprintIndex;
use crate::analyzers::matcher::{sort_matches, MatchConfig, Matcher};
use crate::progress::{ProgressMonitor, ProgressReporter};
use crate::utils::cancel::CancellationToken;
use crate::{AlignError, AudioTrack, Fingerprint, Match, Result, TrackId};

/// Outcome of one alignment run. Cancellation is a normal outcome, not an
/// error; the partially built index is discarded with the run.
#[derive(Debug)]
pub enum AlignOutcome {
    Complete(AlignmentResult),
    Cancelled,
}

#[derive(Debug)]
pub struct AlignmentResult {
    /// Ranked evidence, descending similarity. Immutable once emitted.
    pub matches: Vec<Match>,
    /// Per-track failures; the rest of the batch is unaffected by them.
    pub failures: Vec<TrackFailure>,
    /// Fingerprints extracted per track, indexed by TrackId.
    pub fingerprint_counts: Vec<usize>,
}

#[derive(Debug)]
pub struct TrackFailure {
    pub track: TrackId,
    pub error: AlignError,
}

/// Drives extraction, indexing and matching over a batch of tracks.
///
/// Extraction runs one rayon worker per track, each owning one progress
/// reporter. Matching and index insertion then run in ascending track order,
/// so the emitted match set does not depend on how the extraction workers
/// interleaved, and each unordered pair is matched exactly once.
pub struct Aligner {
    extractor: FingerprintExtractor,
    matcher: Matcher,
    monitor: ProgressMonitor,
    cancel: CancellationToken,
}

impl Aligner {
    pub fn new(
        fingerprint_config: FingerprintConfig,
        match_config: MatchConfig,
        monitor: ProgressMonitor,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            extractor: FingerprintExtractor::new(fingerprint_config),
            matcher: Matcher::new(match_config),
            monitor,
            cancel,
        }
    }

    /// Tracks must carry dense ids matching their position in the slice,
    /// the way the import layer assigns them.
    pub fn align(&self, tracks: &[AudioTrack]) -> AlignOutcome {
        debug_assert!(tracks.iter().enumerate().all(|(i, t)| t.id == i));
        log::info!(
            "aligning {} tracks on {} threads",
            tracks.len(),
            rayon::current_num_threads()
        );

        // Phase 1: per-track extraction, one worker and one reporter each.
        let extractions: Vec<Option<Result<Vec<Fingerprint>>>> = tracks
            .par_iter()
            .map(|track| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let reporter = self.monitor.begin_task(track.name.as_str());
                let result = self.extract_track(track, &reporter);
                reporter.finish();
                Some(result)
            })
            .collect();

        let mut fingerprints: Vec<Option<Vec<Fingerprint>>> = Vec::with_capacity(tracks.len());
        let mut failures = Vec::new();
        let mut counts = vec![0usize; tracks.len()];
        for (track, extraction) in tracks.iter().zip(extractions) {
            match extraction {
                None => return AlignOutcome::Cancelled,
                Some(Err(error)) => {
                    log::warn!("track {} failed: {}", track.name, error);
                    failures.push(TrackFailure {
                        track: track.id,
                        error,
                    });
                    fingerprints.push(None);
                }
                Some(Ok(fps)) => {
                    log::debug!("track {}: {} fingerprints", track.name, fps.len());
                    counts[track.id] = fps.len();
                    fingerprints.push(Some(fps));
                }
            }
        }

        // Phase 2: match against the index, then join it, in id order.
        let mut index = FingerprintIndex::new();
        let mut matches = Vec::new();
        for track in tracks {
            if self.cancel.is_cancelled() {
                return AlignOutcome::Cancelled;
            }
            let Some(fps) = &fingerprints[track.id] else {
                continue;
            };
            matches.extend(self.matcher.match_against_index(track.id, fps, &index, &counts));
            index.insert_all(track.id, fps);
        }
        sort_matches(&mut matches);

        log::info!(
            "alignment complete: {} matches, {} distinct hashes indexed",
            matches.len(),
            index.hash_count()
        );
        AlignOutcome::Complete(AlignmentResult {
            matches,
            failures,
            fingerprint_counts: counts,
        })
    }

    fn extract_track(
        &self,
        track: &AudioTrack,
        reporter: &ProgressReporter,
    ) -> Result<Vec<Fingerprint>> {
        let duration = track.duration_secs();
        let stream = self.extractor.stream(&track.samples, track.sample_rate)?;
        let mut fingerprints = Vec::new();
        for (i, fingerprint) in stream.enumerate() {
            if duration > 0.0 && i % 64 == 0 {
                reporter.report((fingerprint.time_secs / duration * 100.0) as f32);
            }
            fingerprints.push(fingerprint);
        }
        reporter.report(100.0);
        Ok(fingerprints)
    }
}

/// Explicit reconciliation step: place tracks on the master timeline from
/// the match evidence, strongest evidence first. The matches themselves are
/// never modified; tracks without any qualifying evidence keep no offset.
pub fn assign_offsets(tracks: &mut [AudioTrack], matches: &[Match]) {
    for track in tracks.iter_mut() {
        track.offset_secs = None;
    }

    let mut ordered: Vec<&Match> = matches.iter().collect();
    ordered.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.track1, a.track2).cmp(&(b.track1, b.track2)))
    });

    loop {
        let mut placed_any = false;
        for m in &ordered {
            let (Some(i1), Some(i2)) = (
                tracks.iter().position(|t| t.id == m.track1),
                tracks.iter().position(|t| t.id == m.track2),
            ) else {
                continue;
            };
            match (tracks[i1].offset_secs, tracks[i2].offset_secs) {
                (Some(o1), None) => {
                    tracks[i2].offset_secs = Some(o1 + m.track1_time - m.track2_time);
                    placed_any = true;
                }
                (None, Some(o2)) => {
                    tracks[i1].offset_secs = Some(o2 + m.track2_time - m.track1_time);
                    placed_any = true;
                }
                _ => {}
            }
        }
        if placed_any {
            continue;
        }
        // Seed the strongest still-unplaced component, then keep going.
        let Some(seed) = ordered.iter().find(|m| {
            tracks.iter().any(|t| t.id == m.track1 && t.offset_secs.is_none())
                && tracks.iter().any(|t| t.id == m.track2 && t.offset_secs.is_none())
        }) else {
            break;
        };
        if let Some(t) = tracks.iter_mut().find(|t| t.id == seed.track1) {
            t.offset_secs = Some(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(id: TrackId, samples: Vec<f32>) -> AudioTrack {
        AudioTrack::new(id, format!("t{}", id), format!("t{}.wav", id), samples, 22050)
    }

    fn silent_track(id: TrackId) -> AudioTrack {
        track(id, vec![0.0; 22050])
    }

    fn aligner(cancel: CancellationToken) -> Aligner {
        Aligner::new(
            FingerprintConfig::default(),
            MatchConfig::default(),
            ProgressMonitor::new(),
            cancel,
        )
    }

    #[test]
    fn cancelled_token_aborts_the_run() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = aligner(cancel).align(&[silent_track(0), silent_track(1)]);
        assert!(matches!(outcome, AlignOutcome::Cancelled));
    }

    #[test]
    fn degenerate_tracks_complete_with_no_matches() {
        let outcome = aligner(CancellationToken::new()).align(&[silent_track(0), silent_track(1)]);
        let AlignOutcome::Complete(result) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(result.matches, vec![]);
        assert_eq!(result.failures.len(), 0);
        assert_eq!(result.fingerprint_counts, vec![0, 0]);
    }

    #[test]
    fn invalid_track_fails_alone() {
        let mut bad = silent_track(0);
        bad.sample_rate = 0;
        let good = silent_track(1);
        let AlignOutcome::Complete(result) =
            aligner(CancellationToken::new()).align(&[bad, good])
        else {
            panic!("expected completion");
        };
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].track, 0);
        assert!(matches!(result.failures[0].error, AlignError::InvalidInput(_)));
    }

    #[test]
    fn assign_offsets_places_both_tracks_of_a_match() {
        let mut tracks = vec![silent_track(0), silent_track(1)];
        let matches = vec![Match {
            track1: 0,
            track2: 1,
            track1_time: 10.0,
            track2_time: 4.0,
            similarity: 0.9,
        }];
        assign_offsets(&mut tracks, &matches);
        assert_eq!(tracks[0].offset_secs, Some(0.0));
        assert_eq!(tracks[1].offset_secs, Some(6.0));
    }

    #[test]
    fn assign_offsets_chains_through_shared_tracks() {
        let mut tracks = vec![silent_track(0), silent_track(1), silent_track(2)];
        let matches = vec![
            Match {
                track1: 0,
                track2: 1,
                track1_time: 5.0,
                track2_time: 0.0,
                similarity: 0.9,
            },
            Match {
                track1: 1,
                track2: 2,
                track1_time: 3.0,
                track2_time: 1.0,
                similarity: 0.8,
            },
        ];
        assign_offsets(&mut tracks, &matches);
        assert_eq!(tracks[0].offset_secs, Some(0.0));
        assert_eq!(tracks[1].offset_secs, Some(5.0));
        assert_eq!(tracks[2].offset_secs, Some(7.0));
    }

    #[test]
    fn tracks_without_evidence_stay_unplaced() {
        let mut tracks = vec![silent_track(0), silent_track(1), silent_track(2)];
        let matches = vec![Match {
            track1: 0,
            track2: 1,
            track1_time: 1.0,
            track2_time: 0.0,
            similarity: 0.5,
        }];
        assign_offsets(&mut tracks, &matches);
        assert_eq!(tracks[2].offset_secs, None);
    }
}
