use std::path::Path;
use csv::Writer;
use crate::bench::BenchmarkEntry;
use crate::{AudioTrack, Match, Result};

pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_match_report(
        &self,
        tracks: &[AudioTrack],
        matches: &[Match],
        output_path: impl AsRef<Path>,
    ) -> Result<()> {
        let output_path_ref = output_path.as_ref();
        let mut writer = Writer::from_path(output_path_ref)?;

        writer.write_record([
            "Track 1",
            "Track 2",
            "Time in Track 1 (s)",
            "Time in Track 2 (s)",
            "Offset (s)",
            "Similarity",
        ])?;

        for m in matches {
            writer.write_record([
                track_name(tracks, m.track1),
                track_name(tracks, m.track2),
                format!("{:.3}", m.track1_time),
                format!("{:.3}", m.track2_time),
                format!("{:.3}", m.offset_secs()),
                format!("{:.4}", m.similarity),
            ])?;
        }

        // Offset section, one row per track
        writer.write_record(["", "", "", "", "", ""])?;
        writer.write_record(["Track Offsets", "", "", "", "", ""])?;
        for track in tracks {
            let offset = track
                .offset_secs
                .map_or("unaligned".to_string(), |o| format!("{:.3}", o));
            writer.write_record([track.name.clone(), offset, String::new(), String::new(), String::new(), String::new()])?;
        }

        writer.write_record(["", "", "", "", "", ""])?;
        writer.write_record([
            "Total Matches".to_string(),
            matches.len().to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ])?;

        writer.flush()?;
        log::info!("Match report generated: {}", output_path_ref.display());
        Ok(())
    }

    pub fn generate_benchmark_report(
        &self,
        entries: &[BenchmarkEntry],
        output_path: impl AsRef<Path>,
    ) -> Result<()> {
        let output_path_ref = output_path.as_ref();
        let mut writer = Writer::from_path(output_path_ref)?;

        writer.write_record(["Track", "Variant", "Hash Count", "Elapsed (s)"])?;

        for entry in entries {
            writer.write_record([
                entry.track.clone(),
                entry.variant.clone(),
                entry.hash_count.to_string(),
                format!("{:.4}", entry.elapsed.as_secs_f64()),
            ])?;
        }

        writer.flush()?;
        log::info!("Benchmark report generated: {}", output_path_ref.display());
        Ok(())
    }
}

fn track_name(tracks: &[AudioTrack], id: crate::TrackId) -> String {
    tracks
        .iter()
        .find(|t| t.id == id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("track {}", id))
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}
