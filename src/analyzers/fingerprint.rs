use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

use crate::{AlignError, Fingerprint, Result};

/// Number of hash bits per fingerprint; band count is one more.
const HASH_BITS: usize = 32;
const BAND_COUNT: usize = HASH_BITS + 1;

/// Granularity and band layout of the extractor. Window and hop control the
/// match time resolution and are the knobs exposed to callers; the band range
/// covers the spectrum where program material is densest.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintConfig {
    /// Samples per analysis frame.
    pub window_size: usize,
    /// Samples between consecutive frame starts.
    pub hop_size: usize,
    pub min_band_hz: f32,
    pub max_band_hz: f32,
    /// Frames whose summed band energy stays below this produce no hash.
    pub silence_floor: f32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            hop_size: 1024,
            min_band_hz: 300.0,
            max_band_hz: 3000.0,
            silence_floor: 1e-6,
        }
    }
}

/// Turns a decoded mono sample sequence into time-anchored hashes.
///
/// Each frame's spectrum is collapsed into logarithmically spaced bands and
/// the hash takes one bit per band pair: the sign of the change of the
/// band-energy difference between consecutive frames. Uniform gain scales
/// every energy by the same factor, so the signs, and the hashes, survive
/// level differences between recordings of the same event.
pub struct FingerprintExtractor {
    config: FingerprintConfig,
}

impl FingerprintExtractor {
    pub fn new(config: FingerprintConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// Lazy fingerprint sequence ordered by increasing time. Each call
    /// restarts from the beginning of the samples.
    pub fn stream<'a>(
        &self,
        samples: &'a [f32],
        sample_rate: u32,
    ) -> Result<FingerprintStream<'a>> {
        let config = &self.config;
        if sample_rate == 0 {
            return Err(AlignError::InvalidInput("sample rate must be positive".into()));
        }
        if config.hop_size == 0 {
            return Err(AlignError::InvalidInput("hop size must be positive".into()));
        }
        if config.window_size < 4 * BAND_COUNT {
            return Err(AlignError::InvalidInput(format!(
                "window size {} too small for {} analysis bands",
                config.window_size, BAND_COUNT
            )));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.window_size);
        let spectrum = fft.make_output_vec();
        let window = hann(config.window_size);
        let band_edges = band_edges(config, sample_rate);

        Ok(FingerprintStream {
            samples,
            sample_rate,
            pos: 0,
            window_size: config.window_size,
            hop_size: config.hop_size,
            silence_floor: config.silence_floor,
            window,
            fft,
            input: vec![0.0; config.window_size],
            spectrum,
            band_edges,
            prev_energies: None,
        })
    }

    /// Eager form of `stream`.
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<Fingerprint>> {
        Ok(self.stream(samples, sample_rate)?.collect())
    }

    /// Upper bound on the number of frames `stream` will visit.
    pub fn frame_count(&self, sample_count: usize) -> usize {
        if sample_count < self.config.window_size {
            return 0;
        }
        (sample_count - self.config.window_size) / self.config.hop_size + 1
    }
}

fn hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = (std::f32::consts::PI * i as f32) / n as f32;
            t.sin() * t.sin()
        })
        .collect()
}

/// Map the configured frequency range onto FFT bin boundaries, spaced
/// logarithmically, each band at least one bin wide.
fn band_edges(config: &FingerprintConfig, sample_rate: u32) -> Vec<usize> {
    let bin_hz = sample_rate as f32 / config.window_size as f32;
    let spectrum_len = config.window_size / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0 - bin_hz;
    let min_hz = config.min_band_hz.max(bin_hz).min(nyquist);
    let max_hz = config.max_band_hz.clamp(min_hz + 1.0, nyquist.max(min_hz + 1.0));

    let ratio = max_hz / min_hz;
    let mut edges = Vec::with_capacity(BAND_COUNT + 1);
    let mut prev = 0usize;
    for i in 0..=BAND_COUNT {
        let hz = min_hz * ratio.powf(i as f32 / BAND_COUNT as f32);
        let mut bin = (hz / bin_hz).round() as usize;
        if i > 0 && bin <= prev {
            bin = prev + 1;
        }
        let bin = bin.min(spectrum_len - 1);
        edges.push(bin);
        prev = bin;
    }
    edges
}

pub struct FingerprintStream<'a> {
    samples: &'a [f32],
    sample_rate: u32,
    pos: usize,
    window_size: usize,
    hop_size: usize,
    silence_floor: f32,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    band_edges: Vec<usize>,
    prev_energies: Option<[f32; BAND_COUNT]>,
}

impl FingerprintStream<'_> {
    fn band_energies(&mut self, frame_start: usize) -> [f32; BAND_COUNT] {
        let frame = &self.samples[frame_start..frame_start + self.window_size];
        for (dst, (s, w)) in self.input.iter_mut().zip(frame.iter().zip(&self.window)) {
            *dst = s * w;
        }
        self.fft.process(&mut self.input, &mut self.spectrum).ok();

        let mut energies = [0.0f32; BAND_COUNT];
        for b in 0..BAND_COUNT {
            let lo = self.band_edges[b];
            let hi = self.band_edges[b + 1].max(lo + 1).min(self.spectrum.len());
            for c in &self.spectrum[lo..hi] {
                energies[b] += c.norm_sqr();
            }
        }
        energies
    }
}

impl Iterator for FingerprintStream<'_> {
    type Item = Fingerprint;

    fn next(&mut self) -> Option<Fingerprint> {
        loop {
            if self.pos + self.window_size > self.samples.len() {
                return None;
            }
            let frame_start = self.pos;
            self.pos += self.hop_size;

            let energies = self.band_energies(frame_start);
            let total: f32 = energies.iter().sum();
            if total < self.silence_floor {
                // Degenerate frame: emit nothing and do not difference
                // across the gap.
                self.prev_energies = None;
                continue;
            }

            let Some(prev) = self.prev_energies.replace(energies) else {
                // First voiced frame only primes the differencer.
                continue;
            };

            let mut hash = 0u32;
            for b in 0..HASH_BITS {
                let cur_diff = energies[b] - energies[b + 1];
                let prev_diff = prev[b] - prev[b + 1];
                if cur_diff > prev_diff {
                    hash |= 1 << b;
                }
            }

            return Some(Fingerprint {
                hash,
                time_secs: frame_start as f64 / self.sample_rate as f64,
            });
        }
    }
}
