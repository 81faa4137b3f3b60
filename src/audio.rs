//! Audio loading
//!
//! Decodes WAV (via `hound`) and Ogg Vorbis (via `lewton`) files into a mono
//! `f32` buffer in `[-1, 1]`, and resamples buffers to the analysis rate.

use hound::{SampleFormat, WavReader};
use lewton::inside_ogg::OggStreamReader;
use log::{debug, info};
use rustfft::{num_complex::Complex, FftPlanner};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while loading audio.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The file could not be opened.
    #[error("cannot open {}: {}", .path.display(), .source)]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The extension is not a supported container.
    #[error("unsupported audio format `{0}` (expected .wav or .ogg)")]
    UnsupportedFormat(String),

    /// The WAV decoder rejected the data.
    #[error("wav decode error: {0}")]
    Wav(#[from] hound::Error),

    /// The Vorbis decoder rejected the data.
    #[error("vorbis decode error: {0}")]
    Vorbis(#[from] lewton::VorbisError),

    /// The stream declares zero channels, zero bits or a zero sample rate.
    #[error("invalid stream: {0}")]
    InvalidStream(String),
}

/// Mono PCM samples with their sampling rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    /// Samples per second.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Convert to `target_rate` by band-limited Fourier interpolation.
    ///
    /// The whole signal is transformed once, its spectrum truncated or
    /// zero-padded to the new length, and transformed back. The result holds
    /// `ceil(len * target_rate / sample_rate)` samples.
    pub fn resample(&self, target_rate: u32) -> Result<AudioBuffer, AudioError> {
        if self.sample_rate == 0 || target_rate == 0 {
            return Err(AudioError::InvalidStream(format!(
                "cannot resample {} Hz to {} Hz",
                self.sample_rate, target_rate
            )));
        }
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return Ok(AudioBuffer {
                samples: self.samples.clone(),
                sample_rate: target_rate,
            });
        }

        let len = (self.samples.len() as u64 * u64::from(target_rate))
            .div_ceil(u64::from(self.sample_rate)) as usize;
        let samples = fourier_resample(&self.samples, len);
        debug!(
            "resampled {} samples at {} Hz to {} samples at {} Hz",
            self.samples.len(),
            self.sample_rate,
            samples.len(),
            target_rate
        );
        Ok(AudioBuffer { samples, sample_rate: target_rate })
    }
}

/// Resize a signal to `out_len` samples in the frequency domain.
fn fourier_resample(samples: &[f32], out_len: usize) -> Vec<f32> {
    let n = samples.len();
    let mut planner = FftPlanner::<f32>::new();

    let mut spectrum: Vec<Complex<f32>> =
        samples.iter().map(|&re| Complex { re, im: 0.0 }).collect();
    planner.plan_fft_forward(n).process(&mut spectrum);

    // lowest `keep` frequencies, split around DC
    let keep = n.min(out_len);
    let positive = keep / 2 + 1;
    let negative = keep - positive;
    let mut resized = vec![Complex { re: 0.0, im: 0.0 }; out_len];
    resized[..positive].copy_from_slice(&spectrum[..positive]);
    resized[out_len - negative..].copy_from_slice(&spectrum[n - negative..]);

    if keep % 2 == 0 {
        let nyquist = keep / 2;
        if out_len < n {
            resized[nyquist] += spectrum[n - nyquist];
        } else if out_len > n {
            // the old Nyquist bin is shared by both signs of the new spectrum
            resized[nyquist] *= 0.5;
            resized[out_len - nyquist] = resized[nyquist];
        }
    }

    planner.plan_fft_inverse(out_len).process(&mut resized);
    let scale = 1.0 / n as f32;
    resized.iter().map(|c| c.re * scale).collect()
}

/// Load `path` as mono audio, choosing the decoder from the file extension.
pub fn load_mono<P: AsRef<Path>>(path: P) -> Result<AudioBuffer, AudioError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let open = || {
        File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })
    };

    let buffer = match ext.as_str() {
        "wav" | "wave" => load_wav(open()?)?,
        "ogg" | "oga" => load_ogg(open()?)?,
        _ => return Err(AudioError::UnsupportedFormat(ext)),
    };

    info!(
        "loaded {} ({} samples at {} Hz, {:.2}s)",
        path.display(),
        buffer.samples.len(),
        buffer.sample_rate,
        buffer.duration_secs()
    );
    Ok(buffer)
}

fn load_wav(file: File) -> Result<AudioBuffer, AudioError> {
    let reader = WavReader::new(std::io::BufReader::new(file))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 || spec.bits_per_sample == 0 {
        return Err(AudioError::InvalidStream(format!(
            "{} channels of {} bits at {} Hz",
            spec.channels, spec.bits_per_sample, spec.sample_rate
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(AudioBuffer {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

fn load_ogg(file: File) -> Result<AudioBuffer, AudioError> {
    let mut ogg = OggStreamReader::new(file)?;
    let channels = ogg.ident_hdr.audio_channels as usize;
    let sample_rate = ogg.ident_hdr.audio_sample_rate;
    if channels == 0 || sample_rate == 0 {
        return Err(AudioError::InvalidStream(format!(
            "{channels} channels at {sample_rate} Hz"
        )));
    }

    let mut interleaved = Vec::new();
    while let Some(pcm) = ogg.read_dec_packet_itl()? {
        interleaved.extend(pcm.iter().map(|&s| s as f32 / i16::MAX as f32));
    }

    Ok(AudioBuffer {
        samples: downmix(&interleaved, channels),
        sample_rate,
    })
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
