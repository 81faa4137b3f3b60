//! Pitch Tracking
//!
//! Short-time Fourier analysis with parabolic-interpolated peak picking. For
//! every analysis frame each frequency bin gets an instantaneous pitch and a
//! magnitude; bins that are not local spectral peaks are left at zero.

use std::{f32::consts::PI, sync::Arc};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use thiserror::Error;

/// Errors returned by the pitch tracker.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An error occurred during the configuration of the tracker.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Pitch and magnitude data disagree in shape.
    #[error("expected {expected} values for a {bins}x{frames} matrix, got {got}")]
    ShapeMismatch {
        /// Number of frequency bins.
        bins: usize,
        /// Number of frames.
        frames: usize,
        /// Values required (`bins * frames`).
        expected: usize,
        /// Values supplied.
        got: usize,
    },
}

/// Per-bin, per-frame pitch and magnitude readings.
///
/// Storage is bin-major: the value for bin `b` at frame `t` lives at
/// `b * frames + t`.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchMatrix {
    bins: usize,
    frames: usize,
    pitches: Vec<f32>,
    magnitudes: Vec<f32>,
}

impl PitchMatrix {
    /// Wrap bin-major pitch and magnitude buffers of shape `bins x frames`.
    pub fn new(
        bins: usize,
        frames: usize,
        pitches: Vec<f32>,
        magnitudes: Vec<f32>,
    ) -> Result<Self, AnalysisError> {
        let expected = bins * frames;
        for got in [pitches.len(), magnitudes.len()] {
            if got != expected {
                return Err(AnalysisError::ShapeMismatch { bins, frames, expected, got });
            }
        }
        Ok(PitchMatrix { bins, frames, pitches, magnitudes })
    }

    /// Build from per-frame columns of `(pitch, magnitude)` pairs.
    ///
    /// Every column must have the same number of bins.
    pub fn from_columns(columns: &[Vec<(f32, f32)>]) -> Result<Self, AnalysisError> {
        let frames = columns.len();
        let bins = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != bins) {
            return Err(AnalysisError::ShapeMismatch {
                bins,
                frames,
                expected: bins * frames,
                got: columns.iter().map(Vec::len).sum(),
            });
        }

        let mut pitches = vec![0.0; bins * frames];
        let mut magnitudes = vec![0.0; bins * frames];
        for (t, column) in columns.iter().enumerate() {
            for (b, &(pitch, mag)) in column.iter().enumerate() {
                pitches[b * frames + t] = pitch;
                magnitudes[b * frames + t] = mag;
            }
        }
        Ok(PitchMatrix { bins, frames, pitches, magnitudes })
    }

    /// Number of frequency bins.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Number of analysis frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Pitch in Hz of bin `bin` at frame `frame` (0 when no peak).
    pub fn pitch(&self, bin: usize, frame: usize) -> f32 {
        self.pitches[bin * self.frames + frame]
    }

    /// Magnitude of bin `bin` at frame `frame`.
    pub fn magnitude(&self, bin: usize, frame: usize) -> f32 {
        self.magnitudes[bin * self.frames + frame]
    }

    /// `(pitch, magnitude)` for every bin of one frame.
    pub fn column(&self, frame: usize) -> impl Iterator<Item = (f32, f32)> + '_ {
        (0..self.bins).map(move |b| (self.pitch(b, frame), self.magnitude(b, frame)))
    }
}

/// Builder for a [`PitchTracker`].
pub struct PitchTrackerBuilder {
    n_fft: usize,
    hop_length: usize,
    sample_rate: u32,
    fmin: f32,
    fmax: f32,
    threshold: f32,
}

impl PitchTrackerBuilder {
    /// Start with default parameters:
    /// n_fft = 2048, hop_length = 512, sample_rate = 22_050,
    /// fmin = 150 Hz, fmax = 4000 Hz, threshold = 0.1.
    pub fn new() -> Self {
        PitchTrackerBuilder {
            n_fft: 2048,
            hop_length: 512,
            sample_rate: 22_050,
            fmin: 150.0,
            fmax: 4000.0,
            threshold: 0.1,
        }
    }

    /// Set the FFT window length in samples.
    pub fn n_fft(mut self, n: usize) -> Self {
        self.n_fft = n;
        self
    }

    /// Set the number of samples between consecutive frames.
    pub fn hop_length(mut self, hop: usize) -> Self {
        self.hop_length = hop;
        self
    }

    /// Set the sampling rate of the audio.
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the lowest frequency (inclusive) considered for peaks.
    pub fn fmin(mut self, hz: f32) -> Self {
        self.fmin = hz;
        self
    }

    /// Set the highest frequency (exclusive) considered for peaks.
    pub fn fmax(mut self, hz: f32) -> Self {
        self.fmax = hz;
        self
    }

    /// Set the peak threshold relative to each frame's loudest bin.
    pub fn threshold(mut self, t: f32) -> Self {
        self.threshold = t;
        self
    }

    /// Finalize and create the tracker.
    pub fn build(self) -> Result<PitchTracker, AnalysisError> {
        if self.n_fft < 4 {
            return Err(AnalysisError::Configuration("n_fft must be at least 4".into()));
        }
        if self.hop_length == 0 {
            return Err(AnalysisError::Configuration("hop_length cannot be zero".into()));
        }
        if self.sample_rate == 0 {
            return Err(AnalysisError::Configuration("sample_rate cannot be zero".into()));
        }
        if self.fmin.is_nan() || self.fmax.is_nan() || self.fmin >= self.fmax {
            return Err(AnalysisError::Configuration(format!(
                "fmin ({}) must be below fmax ({})",
                self.fmin, self.fmax
            )));
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.n_fft);

        Ok(PitchTracker {
            window: hann_window(self.n_fft),
            fft_buffer: vec![Complex { re: 0.0, im: 0.0 }; self.n_fft],
            spectrum: vec![0.0; self.n_fft / 2 + 1],
            n_fft: self.n_fft,
            hop_length: self.hop_length,
            sample_rate: self.sample_rate,
            fmin: self.fmin,
            fmax: self.fmax,
            threshold: self.threshold,
            fft,
        })
    }
}

impl Default for PitchTrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame-wise spectral pitch tracker.
pub struct PitchTracker {
    window: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    spectrum: Vec<f32>,
    n_fft: usize,
    hop_length: usize,
    sample_rate: u32,
    fmin: f32,
    fmax: f32,
    threshold: f32,
    fft: Arc<dyn Fft<f32>>,
}

impl PitchTracker {
    /// Start customizing with a builder.
    pub fn builder() -> PitchTrackerBuilder {
        PitchTrackerBuilder::new()
    }

    /// Number of frequency bins per frame (`n_fft / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Samples between frames.
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Number of frames produced for a signal of `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Analyse a whole mono signal.
    ///
    /// Frames are centred: frame `t` covers samples around `t * hop_length`,
    /// with zeros outside the signal.
    pub fn track(&mut self, signal: &[f32]) -> PitchMatrix {
        let bins = self.bins();
        let frames = self.frame_count(signal.len());
        let mut pitches = vec![0.0; bins * frames];
        let mut magnitudes = vec![0.0; bins * frames];

        for t in 0..frames {
            self.compute_spectrum(signal, t);
            self.pick_peaks(|b, pitch, mag| {
                pitches[b * frames + t] = pitch;
                magnitudes[b * frames + t] = mag;
            });
        }

        PitchMatrix { bins, frames, pitches, magnitudes }
    }

    #[inline]
    fn compute_spectrum(&mut self, signal: &[f32], frame: usize) {
        let half = self.n_fft / 2;
        let centre = frame * self.hop_length;

        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            // index into the signal, zero-padded by n_fft/2 on both sides
            let sample = (centre + i)
                .checked_sub(half)
                .and_then(|idx| signal.get(idx))
                .copied()
                .unwrap_or(0.0);
            slot.re = sample * self.window[i];
            slot.im = 0.0;
        }

        self.fft.process(&mut self.fft_buffer);

        for (i, mag) in self.spectrum.iter_mut().enumerate() {
            let c = &self.fft_buffer[i];
            *mag = (c.re * c.re + c.im * c.im).sqrt();
        }
    }

    #[inline]
    fn pick_peaks(&self, mut emit: impl FnMut(usize, f32, f32)) {
        let s = &self.spectrum;
        let bin_hz = self.sample_rate as f32 / self.n_fft as f32;
        let loudest = s.iter().cloned().fold(0.0_f32, f32::max);
        let floor = self.threshold * loudest;

        for i in 1..s.len() - 1 {
            let freq = i as f32 * bin_hz;
            if freq < self.fmin || freq >= self.fmax {
                continue;
            }
            let (left, centre, right) = (s[i - 1], s[i], s[i + 1]);
            if !(centre > left && centre >= right && centre > floor) {
                continue;
            }

            let avg = 0.5 * (right - left);
            let mut curvature = 2.0 * centre - right - left;
            if curvature.abs() < f32::MIN_POSITIVE {
                curvature += 1.0;
            }
            let shift = avg / curvature;

            emit(i, (i as f32 + shift) * bin_hz, centre + 0.5 * avg * shift);
        }
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / size as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[2] - w[6]).abs() < 1e-6);
    }

    #[test]
    fn rejects_inverted_frequency_band() {
        let result = PitchTracker::builder().fmin(500.0).fmax(100.0).build();
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }

    #[test]
    fn matrix_shape_is_checked() {
        let result = PitchMatrix::new(2, 3, vec![0.0; 6], vec![0.0; 5]);
        assert!(matches!(
            result,
            Err(AnalysisError::ShapeMismatch { expected: 6, got: 5, .. })
        ));
    }
}
