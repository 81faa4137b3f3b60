//! Score
//!
//! Quantized score events and the single-part score they are assembled into.

use crate::pitch::{NamedPitch, PitchClass};
use log::debug;
use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::ops::{Add, AddAssign};

/// Ticks in one quarter note; a tick is a sixteenth note.
pub const TICKS_PER_QUARTER: u32 = 4;

/// A note length counted in sixteenth-note ticks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    ticks: u32,
}

impl Duration {
    /// The length of one extracted frame.
    pub const TICK: Duration = Duration { ticks: 1 };

    /// A duration of `ticks` sixteenths.
    pub const fn from_ticks(ticks: u32) -> Self {
        Duration { ticks }
    }

    /// Length in sixteenth-note ticks.
    pub const fn ticks(self) -> u32 {
        self.ticks
    }

    /// Length as a multiple of a quarter note.
    pub fn quarter_length(self) -> f64 {
        self.ticks as f64 / TICKS_PER_QUARTER as f64
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration { ticks: self.ticks + rhs.ticks }
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        self.ticks += rhs.ticks;
    }
}

/// Simultaneous in-key pitches held for a duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedChord {
    /// Pitches, lowest first, without repeats.
    pub pitches: Vec<NamedPitch>,
    /// How long the chord is held.
    pub duration: Duration,
}

impl QuantizedChord {
    /// Build a chord, sorting pitches by MIDI number and dropping repeats.
    ///
    /// A chord with no pitches is laid out as a rest by [`assemble`].
    pub fn new(mut pitches: Vec<NamedPitch>, duration: Duration) -> Self {
        pitches.sort_by_key(|p| (p.midi(), p.class));
        pitches.dedup();
        QuantizedChord { pitches, duration }
    }

    /// The set of pitch-class spellings, ignoring octave. Chords with equal
    /// sets are considered the same chord.
    pub fn pitch_names(&self) -> BTreeSet<PitchClass> {
        self.pitches.iter().map(|p| p.class).collect()
    }
}

/// Silence held for a duration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QuantizedRest {
    /// How long the rest lasts.
    pub duration: Duration,
}

/// One entry of the part, in time order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreEvent {
    /// A chord (a single note is a one-pitch chord).
    Chord(QuantizedChord),
    /// A rest.
    Rest(QuantizedRest),
}

impl ScoreEvent {
    /// A rest of `duration`.
    pub fn rest(duration: Duration) -> Self {
        ScoreEvent::Rest(QuantizedRest { duration })
    }

    /// Length of the event.
    pub fn duration(&self) -> Duration {
        match self {
            ScoreEvent::Chord(c) => c.duration,
            ScoreEvent::Rest(r) => r.duration,
        }
    }

    /// Whether this is a rest.
    pub fn is_rest(&self) -> bool {
        matches!(self, ScoreEvent::Rest(_))
    }

    /// The chord, if this is one.
    pub fn as_chord(&self) -> Option<&QuantizedChord> {
        match self {
            ScoreEvent::Chord(c) => Some(c),
            ScoreEvent::Rest(_) => None,
        }
    }
}

/// Meter marking, e.g. 4/4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSignature {
    /// Beats per measure.
    pub beats: u32,
    /// Note value of one beat (4 = quarter).
    pub beat_type: u32,
}

impl TimeSignature {
    /// Ticks in one full measure.
    pub fn measure_ticks(&self) -> u32 {
        self.beats * TICKS_PER_QUARTER * 4 / self.beat_type
    }
}

impl Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

/// Metronome marking in quarter notes per minute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tempo {
    /// Quarter notes per minute.
    pub bpm: u32,
}

/// A single instrumental part: meter, tempo, then events in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    time_signature: TimeSignature,
    tempo: Tempo,
    events: Vec<ScoreEvent>,
}

impl Score {
    /// The meter marking at the start of the part.
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// The tempo marking at the start of the part.
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Events in time order.
    pub fn events(&self) -> &[ScoreEvent] {
        &self.events
    }

    /// Sum of all event durations.
    pub fn total_duration(&self) -> Duration {
        self.events
            .iter()
            .fold(Duration::from_ticks(0), |acc, e| acc + e.duration())
    }
}

/// Lay events into a 4/4, ♩=120 part.
///
/// Chords without pitches become rests, and neighbouring rests are joined
/// into one. Other chords are kept as given.
pub fn assemble(events: Vec<ScoreEvent>) -> Score {
    let incoming = events.len();
    let mut laid: Vec<ScoreEvent> = Vec::with_capacity(incoming);

    for event in events {
        let event = match event {
            ScoreEvent::Chord(chord) if chord.pitches.is_empty() => {
                ScoreEvent::rest(chord.duration)
            }
            other => other,
        };
        if let (Some(ScoreEvent::Rest(prev)), ScoreEvent::Rest(rest)) =
            (laid.last_mut(), &event)
        {
            prev.duration += rest.duration;
            continue;
        }
        laid.push(event);
    }

    debug!("assembled {} events into {} score entries", incoming, laid.len());

    Score {
        time_signature: TimeSignature { beats: 4, beat_type: 4 },
        tempo: Tempo { bpm: 120 },
        events: laid,
    }
}
