use pretty_assertions::assert_eq;
use track_aligner::{
    assign_offsets, AlignOutcome, Aligner, AudioTrack, CancellationToken, FingerprintConfig,
    MatchConfig, ProgressEvent, ProgressMonitor,
};

const SR: u32 = 22050;
const HOP: usize = 1024;

/// Non-stationary test signal: a phase-continuous tone whose frequency jumps
/// every few hundred samples, driven by a seeded LCG. The spectrum changes
/// from frame to frame, so fingerprints vary over time, and different seeds
/// give acoustically unrelated content.
fn tone_chain(seed: u64, secs: f32) -> Vec<f32> {
    let segment_len = 512usize;
    let total = (secs * SR as f32) as usize;
    let mut state = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    let mut phase = 0.0f32;
    let mut samples = Vec::with_capacity(total);
    while samples.len() < total {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let freq = 300.0 + (state >> 33) as f32 % 2200.0;
        let step = 2.0 * std::f32::consts::PI * freq / SR as f32;
        for _ in 0..segment_len.min(total - samples.len()) {
            phase += step;
            if phase > 2.0 * std::f32::consts::PI {
                phase -= 2.0 * std::f32::consts::PI;
            }
            samples.push(0.8 * phase.sin());
        }
    }
    samples
}

fn lcg_noise(seed: u64, secs: f32) -> Vec<f32> {
    let total = (secs * SR as f32) as usize;
    let mut state = seed | 1;
    (0..total)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / 8388608.0) - 1.0
        })
        .collect()
}

fn track(id: usize, name: &str, samples: Vec<f32>) -> AudioTrack {
    AudioTrack::new(id, name, format!("{}.wav", name), samples, SR)
}

fn default_aligner(monitor: ProgressMonitor) -> Aligner {
    Aligner::new(
        FingerprintConfig::default(),
        MatchConfig::default(),
        monitor,
        CancellationToken::new(),
    )
}

fn run(tracks: &[AudioTrack]) -> track_aligner::AlignmentResult {
    let aligner = default_aligner(ProgressMonitor::new());
    match aligner.align(tracks) {
        AlignOutcome::Complete(result) => result,
        AlignOutcome::Cancelled => panic!("unexpected cancellation"),
    }
}

#[test]
fn shifted_copy_aligns_at_the_shift() {
    // Shift by a whole number of hops so both tracks see identical windows.
    let shift_samples = HOP * 16;
    let shift_secs = shift_samples as f64 / SR as f64;
    let base = tone_chain(11, 6.0);
    let trimmed = base[shift_samples..].to_vec();

    let tracks = vec![track(0, "full", base), track(1, "trimmed", trimmed)];
    let result = run(&tracks);

    assert_eq!(result.matches.len(), 1);
    let m = &result.matches[0];
    assert_eq!((m.track1, m.track2), (0, 1));
    assert!(m.similarity >= 0.9, "similarity was {}", m.similarity);
    // Content at t in "trimmed" sits at t + shift in "full".
    let offset = m.track1_time - m.track2_time;
    assert!(
        (offset - shift_secs).abs() <= 0.05,
        "estimated offset {} vs expected {}",
        offset,
        shift_secs
    );

    let mut tracks = tracks;
    assign_offsets(&mut tracks, &result.matches);
    assert_eq!(tracks[0].offset_secs, Some(0.0));
    let placed = tracks[1].offset_secs.expect("trimmed track placed");
    assert!((placed - shift_secs).abs() <= 0.05);
}

#[test]
fn alignment_is_deterministic_across_runs() {
    let base = tone_chain(5, 5.0);
    let shifted = base[HOP * 8..].to_vec();
    let noise = lcg_noise(99, 5.0);
    let tracks = vec![
        track(0, "a", base),
        track(1, "b", shifted),
        track(2, "c", noise),
    ];

    let first = run(&tracks);
    let second = run(&tracks);
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.fingerprint_counts, second.fingerprint_counts);
}

#[test]
fn unrelated_noise_tracks_do_not_match() {
    let tracks = vec![
        track(0, "noise-a", lcg_noise(1, 3.0)),
        track(1, "noise-b", lcg_noise(2, 3.0)),
    ];
    let result = run(&tracks);
    assert_eq!(result.matches, vec![]);
}

#[test]
fn matches_never_pair_a_track_with_itself() {
    let base = tone_chain(3, 5.0);
    let shifted = base[HOP * 4..].to_vec();
    let tracks = vec![
        track(0, "a", base.clone()),
        track(1, "b", shifted),
        track(2, "c", base),
    ];
    let result = run(&tracks);

    assert!(!result.matches.is_empty());
    for m in &result.matches {
        assert!(m.track1 != m.track2);
        assert!(m.track1 < m.track2);
        assert!((0.0..=1.0).contains(&m.similarity));
    }
}

#[test]
fn cancellation_is_a_clean_outcome() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let aligner = Aligner::new(
        FingerprintConfig::default(),
        MatchConfig::default(),
        ProgressMonitor::new(),
        cancel,
    );
    let tracks = vec![
        track(0, "a", tone_chain(1, 2.0)),
        track(1, "b", tone_chain(2, 2.0)),
    ];
    assert!(matches!(aligner.align(&tracks), AlignOutcome::Cancelled));
}

#[test]
fn alignment_reports_progress_with_balanced_edges() {
    let monitor = ProgressMonitor::new();
    let events = monitor.subscribe();
    let aligner = default_aligner(monitor.clone());

    let base = tone_chain(7, 4.0);
    let shifted = base[HOP * 8..].to_vec();
    let tracks = vec![track(0, "a", base), track(1, "b", shifted)];
    let outcome = aligner.align(&tracks);
    assert!(matches!(outcome, AlignOutcome::Complete(_)));

    drop(aligner);
    drop(monitor);
    let events: Vec<ProgressEvent> = events.into_iter().collect();

    let started = events
        .iter()
        .filter(|e| **e == ProgressEvent::Started)
        .count();
    let finished = events
        .iter()
        .filter(|e| **e == ProgressEvent::Finished)
        .count();
    assert!(started >= 1);
    assert_eq!(started, finished);
    assert_eq!(events.last(), Some(&ProgressEvent::Finished));
    assert!(events.iter().any(|e| matches!(e, ProgressEvent::Progress(_))));
    for e in &events {
        if let ProgressEvent::Progress(p) = e {
            assert!((0.0..=100.0).contains(p));
        }
    }
}

#[test]
fn per_track_failure_does_not_suppress_other_matches() {
    let base = tone_chain(9, 5.0);
    let shifted = base[HOP * 8..].to_vec();
    let mut broken = track(2, "broken", tone_chain(4, 2.0));
    broken.sample_rate = 0;

    let tracks = vec![track(0, "a", base), track(1, "b", shifted), broken];
    let result = run(&tracks);

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].track, 2);
    assert_eq!(result.matches.len(), 1);
    assert_eq!((result.matches[0].track1, result.matches[0].track2), (0, 1));
}
