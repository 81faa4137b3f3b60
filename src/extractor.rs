//! Frame Chord Extractor
//!
//! Turns a pitch/magnitude matrix into a time-stamped stream of chords and
//! rests, one event per visited frame.

use crate::piptrack::PitchMatrix;
use log::debug;
use serde::Serialize;
use thiserror::Error;

/// Errors when extracting chord events.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The frame decimation stride was zero.
    #[error("skip_factor must be >= 1")]
    InvalidSkipFactor,

    /// The sample rate was zero.
    #[error("sample_rate must be > 0")]
    InvalidSampleRate,
}

/// Pitches sounding at one instant. An empty pitch list is a rest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawChordEvent {
    /// Onset of the frame in seconds.
    pub time: f64,
    /// Detected frequencies in Hz, in bin order.
    pub pitches: Vec<f32>,
}

impl RawChordEvent {
    /// A silent frame at `time`.
    pub fn rest(time: f64) -> Self {
        RawChordEvent { time, pitches: Vec::new() }
    }

    /// Whether no pitch was detected.
    pub fn is_rest(&self) -> bool {
        self.pitches.is_empty()
    }
}

/// Collect the chord (or rest) of every `skip_factor`-th frame.
///
/// A bin contributes when its magnitude is strictly greater than
/// `amplitude_threshold` and its pitch is positive. Exactly
/// `ceil(frames / skip_factor)` events are returned.
pub fn extract(
    matrix: &PitchMatrix,
    hop_length: usize,
    sample_rate: u32,
    skip_factor: usize,
    amplitude_threshold: f32,
) -> Result<Vec<RawChordEvent>, ExtractError> {
    if skip_factor == 0 {
        return Err(ExtractError::InvalidSkipFactor);
    }
    if sample_rate == 0 {
        return Err(ExtractError::InvalidSampleRate);
    }

    let events: Vec<RawChordEvent> = (0..matrix.frames())
        .step_by(skip_factor)
        .map(|t| {
            let time = (t * hop_length) as f64 / sample_rate as f64;
            let pitches = matrix
                .column(t)
                .filter(|&(pitch, mag)| mag > amplitude_threshold && pitch > 0.0)
                .map(|(pitch, _)| pitch)
                .collect();
            RawChordEvent { time, pitches }
        })
        .collect();

    debug!(
        "extracted {} events from {} frames ({} rests)",
        events.len(),
        matrix.frames(),
        events.iter().filter(|e| e.is_rest()).count()
    );
    Ok(events)
}
