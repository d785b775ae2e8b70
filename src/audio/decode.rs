use std::path::{Path, PathBuf};

use rayon::prelude::*;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::{AlignError, AudioTrack, Result, TrackId};

/// Import layer between the filesystem and the alignment core: finds audio
/// files and turns each into a decoded mono sample sequence. The core itself
/// never touches containers or codecs.
pub struct TrackImporter;

impl TrackImporter {
    /// Decode one file to mono f32 samples plus its sample rate. Channels
    /// are averaged; packets the decoder cannot handle are skipped.
    pub fn decode_file(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AlignError::Decode(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| AlignError::Decode("no audio track in container".into()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| AlignError::Decode("stream carries no sample rate".into()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AlignError::UnsupportedFormat(e.to_string()))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(AlignError::Decode(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let buf = sample_buf.get_or_insert_with(|| {
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                    });
                    buf.copy_interleaved_ref(decoded);
                    let channels = spec.channels.count().max(1);
                    for frame in buf.samples().chunks_exact(channels) {
                        samples.push(frame.iter().sum::<f32>() / channels as f32);
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("{}: skipping undecodable packet: {}", path.display(), e);
                }
                Err(e) => return Err(AlignError::Decode(e.to_string())),
            }
        }

        Ok((samples, sample_rate))
    }

    /// Collect audio files under the given directories, sorted by path so
    /// track ids are reproducible from run to run.
    pub fn scan_audio_files(dirs: &[impl AsRef<Path>]) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for dir in dirs {
            for entry in walkdir::WalkDir::new(dir.as_ref()).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        log::warn!("error accessing entry: {}", err);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let has_valid_ext = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|ext| matches!(ext.to_lowercase().as_str(), "mp3" | "wav" | "flac"))
                    .unwrap_or(false);
                if has_valid_ext {
                    paths.push(entry.into_path());
                } else {
                    log::debug!("skipping non-audio file: {}", entry.path().display());
                }
            }
        }
        paths.sort();
        paths
    }

    /// Scan and decode in parallel. Files that fail to decode are reported
    /// alongside the successes and never abort their siblings; ids are dense
    /// over the successfully decoded tracks, in sorted path order.
    pub fn import_tracks(
        dirs: &[impl AsRef<Path>],
    ) -> (Vec<AudioTrack>, Vec<(PathBuf, AlignError)>) {
        let paths = Self::scan_audio_files(dirs);
        log::info!("found {} audio files", paths.len());

        let decoded: Vec<(PathBuf, Result<(Vec<f32>, u32)>)> = paths
            .into_par_iter()
            .map(|path| {
                let result = Self::decode_file(&path);
                (path, result)
            })
            .collect();

        let mut tracks = Vec::new();
        let mut failures = Vec::new();
        for (path, result) in decoded {
            match result {
                Ok((samples, sample_rate)) => {
                    let name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unnamed")
                        .to_string();
                    let id: TrackId = tracks.len();
                    log::debug!(
                        "imported {} ({} samples at {} Hz)",
                        name,
                        samples.len(),
                        sample_rate
                    );
                    tracks.push(AudioTrack::new(id, name, path, samples, sample_rate));
                }
                Err(error) => {
                    log::warn!("failed to decode {}: {}", path.display(), error);
                    failures.push((path, error));
                }
            }
        }
        (tracks, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.wav"), b"not really audio").unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"not really audio").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let paths = TrackImporter::scan_audio_files(&[dir.path()]);
        let names: Vec<_> = paths
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.wav"]);
    }

    #[test]
    fn undecodable_files_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.wav"), b"definitely not a wav").unwrap();

        let (tracks, failures) = TrackImporter::import_tracks(&[dir.path()]);
        assert!(tracks.is_empty());
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = TrackImporter::decode_file("/no/such/file.wav").unwrap_err();
        assert!(matches!(err, AlignError::Io(_)));
    }
}
