//! Chord Quantizer
//!
//! Maps raw frequency sets onto in-key chords and run-length merges repeats.

use crate::extractor::RawChordEvent;
use crate::key_table::KeyScale;
use crate::pitch::{NamedPitch, PitchClass};
use crate::score::{Duration, QuantizedChord, ScoreEvent};
use crate::snap::snap_pitch;
use log::debug;
use std::collections::BTreeSet;

/// Converts raw chord events into score events for one key.
#[derive(Debug, Clone)]
pub struct Quantizer {
    scale: KeyScale,
    unit: Duration,
}

/// Fold accumulator: events emitted so far and the pitch names of the last
/// one, if it is a chord.
#[derive(Debug, Default)]
struct QuantizeState {
    events: Vec<ScoreEvent>,
    last_names: Option<BTreeSet<PitchClass>>,
}

impl Quantizer {
    /// A quantizer for `scale` where each raw frame lasts one tick.
    pub fn new(scale: KeyScale) -> Self {
        Quantizer { scale, unit: Duration::TICK }
    }

    /// Use `unit` as the length of every raw frame.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// The scale pitches are forced into.
    pub fn scale(&self) -> &KeyScale {
        &self.scale
    }

    /// Round a frequency to the nearest MIDI note and snap it into the scale.
    ///
    /// Non-positive frequencies give `None`.
    pub fn quantize_pitch(&self, hz: f32) -> Option<NamedPitch> {
        NamedPitch::from_hz(hz).map(|p| snap_pitch(p, &self.scale))
    }

    /// Quantize one set of frequencies into a chord of unit length.
    ///
    /// Returns `None` if no frequency is a valid pitch.
    pub fn quantize_chord(&self, pitches: &[f32]) -> Option<QuantizedChord> {
        let named: Vec<NamedPitch> = pitches
            .iter()
            .filter_map(|&hz| self.quantize_pitch(hz))
            .collect();
        if named.is_empty() {
            return None;
        }
        Some(QuantizedChord::new(named, self.unit))
    }

    /// Quantize a whole event stream.
    ///
    /// Rests are emitted one per frame and break any run of chords. A chord
    /// with the same pitch-class names as the chord just emitted replaces it,
    /// carrying the summed duration.
    pub fn quantize(&self, raw_events: &[RawChordEvent]) -> Vec<ScoreEvent> {
        let state = raw_events
            .iter()
            .fold(QuantizeState::default(), |state, event| self.step(state, event));

        debug!(
            "quantized {} raw events into {} score events",
            raw_events.len(),
            state.events.len()
        );
        state.events
    }

    fn step(&self, mut state: QuantizeState, event: &RawChordEvent) -> QuantizeState {
        let chord = match self.quantize_chord(&event.pitches) {
            Some(chord) => chord,
            None => {
                state.events.push(ScoreEvent::rest(self.unit));
                state.last_names = None;
                return state;
            }
        };

        let names = chord.pitch_names();
        if state.last_names.as_ref() == Some(&names) {
            if let Some(ScoreEvent::Chord(prev)) = state.events.last_mut() {
                // latest voicing wins, durations add up
                prev.pitches = chord.pitches;
                prev.duration += chord.duration;
                return state;
            }
        }

        state.events.push(ScoreEvent::Chord(chord));
        state.last_names = Some(names);
        state
    }
}

/// Quantize `raw_events` against `scale` with one tick per frame.
pub fn quantize(raw_events: &[RawChordEvent], scale: &KeyScale) -> Vec<ScoreEvent> {
    Quantizer::new(*scale).quantize(raw_events)
}
