//! Pitch
//!
//! Spelled pitch classes, octave-qualified pitches and the Hz/MIDI conversions
//! the quantizer relies on.
//!
//! Spellings follow the convention used by the key table: a step letter, then
//! `#` for each sharp or `-` for each flat (`"C#"`, `"B-"`, `"E--"`).

use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

const SEMITONES: i32 = 12;

/// MIDI number and frequency of the tuning reference, A4.
const A4_MIDI: f32 = 69.0;
const A4_HZ: f32 = 440.0;

/// Octave used when only the pitch class matters.
pub const CANONICAL_OCTAVE: i32 = 4;

/// Spelling chosen for each of the twelve MIDI pitch classes.
const MIDI_SPELLINGS: [(Step, i8); SEMITONES as usize] = [
    (Step::C, 0),
    (Step::C, 1),
    (Step::D, 0),
    (Step::E, -1),
    (Step::E, 0),
    (Step::F, 0),
    (Step::F, 1),
    (Step::G, 0),
    (Step::G, 1),
    (Step::A, 0),
    (Step::B, -1),
    (Step::B, 0),
];

/// Errors produced while parsing pitch names.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PitchError {
    /// The name was empty.
    #[error("empty pitch name")]
    Empty,

    /// The first character is not a step letter `A`..`G`.
    #[error("unknown step letter in `{0}`")]
    UnknownStep(String),

    /// Accidentals were mixed, repeated too often or followed by junk.
    #[error("malformed accidental in `{0}`")]
    BadAccidental(String),

    /// The octave suffix could not be parsed.
    #[error("malformed octave in `{0}`")]
    BadOctave(String),
}

/// The seven natural note letters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// C
    C,
    /// D
    D,
    /// E
    E,
    /// F
    F,
    /// G
    G,
    /// A
    A,
    /// B
    B,
}

impl Step {
    /// Semitones above C of the natural note.
    pub const fn semitone(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Upper-case letter of the step.
    pub const fn letter(self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }

    fn from_letter(c: char) -> Option<Step> {
        match c {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }
}

/// A spelled pitch class such as `C#` or `B-`, independent of octave.
///
/// Two enharmonic spellings (`C#` and `D-`) are distinct values: membership in a
/// key scale is decided by spelling, distance by semitone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PitchClass {
    step: Step,
    alter: i8,
}

impl PitchClass {
    /// Build a pitch class from a step and an alteration in semitones.
    pub const fn new(step: Step, alter: i8) -> Self {
        PitchClass { step, alter }
    }

    /// The step letter.
    pub const fn step(self) -> Step {
        self.step
    }

    /// Alteration in semitones (`+1` sharp, `-1` flat).
    pub const fn alter(self) -> i8 {
        self.alter
    }

    /// Semitones above C, without wrapping: `C-` is `-1`, `B#` is `12`.
    pub const fn semitone(self) -> i32 {
        self.step.semitone() + self.alter as i32
    }

    /// Spelling used for a MIDI note number.
    pub fn from_midi(midi: i32) -> Self {
        let (step, alter) = MIDI_SPELLINGS[midi.rem_euclid(SEMITONES) as usize];
        PitchClass { step, alter }
    }
}

impl Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step.letter())?;
        let mark = if self.alter > 0 { '#' } else { '-' };
        for _ in 0..self.alter.unsigned_abs() {
            write!(f, "{mark}")?;
        }
        Ok(())
    }
}

impl FromStr for PitchClass {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, rest) = split_class(s)?;
        if !rest.is_empty() {
            return Err(PitchError::BadAccidental(s.to_string()));
        }
        Ok(class)
    }
}

/// Parse a step letter and its accidentals, returning whatever follows.
fn split_class(s: &str) -> Result<(PitchClass, &str), PitchError> {
    let mut chars = s.chars();
    let first = chars.next().ok_or(PitchError::Empty)?;
    let step = Step::from_letter(first.to_ascii_uppercase())
        .ok_or_else(|| PitchError::UnknownStep(s.to_string()))?;

    let rest = chars.as_str();
    let marks = rest.chars().take_while(|c| *c == '#' || *c == '-').count();
    let accidentals = &rest[..marks];

    let alter = match accidentals.chars().next() {
        None => 0,
        Some(mark) => {
            if marks > 4 || accidentals.chars().any(|c| c != mark) {
                return Err(PitchError::BadAccidental(s.to_string()));
            }
            let n = marks as i8;
            if mark == '#' { n } else { -n }
        }
    };

    Ok((PitchClass { step, alter }, &rest[marks..]))
}

/// A pitch class pinned to an octave, e.g. `C#4`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NamedPitch {
    /// Spelled pitch class.
    pub class: PitchClass,
    /// Scientific octave number (C4 is middle C).
    pub octave: i32,
}

impl NamedPitch {
    /// Combine a class and an octave.
    pub const fn new(class: PitchClass, octave: i32) -> Self {
        NamedPitch { class, octave }
    }

    /// Spell a MIDI note number.
    pub fn from_midi(midi: i32) -> Self {
        NamedPitch {
            class: PitchClass::from_midi(midi),
            octave: midi.div_euclid(SEMITONES) - 1,
        }
    }

    /// Nearest MIDI note to a frequency, spelled.
    ///
    /// Returns `None` for non-positive or non-finite frequencies.
    pub fn from_hz(hz: f32) -> Option<Self> {
        if hz <= 0.0 || !hz.is_finite() {
            return None;
        }
        Some(Self::from_midi(hz_to_midi(hz).round() as i32))
    }

    /// MIDI note number, honouring the spelling (`B#3` is 60).
    pub const fn midi(self) -> i32 {
        SEMITONES * (self.octave + 1) + self.class.semitone()
    }

    /// Replace the pitch class while keeping the octave number.
    pub const fn with_class(self, class: PitchClass) -> Self {
        NamedPitch { class, octave: self.octave }
    }
}

impl Display for NamedPitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.octave)
    }
}

impl FromStr for NamedPitch {
    type Err = PitchError;

    /// Parses `"C#4"`; a missing octave defaults to [`CANONICAL_OCTAVE`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class, rest) = split_class(s)?;
        let octave = if rest.is_empty() {
            CANONICAL_OCTAVE
        } else {
            rest.parse::<i32>()
                .map_err(|_| PitchError::BadOctave(s.to_string()))?
        };
        Ok(NamedPitch { class, octave })
    }
}

/// Fractional MIDI note number of a frequency (A4 = 440 Hz = 69).
pub fn hz_to_midi(hz: f32) -> f32 {
    A4_MIDI + 12.0 * (hz / A4_HZ).log2()
}

/// Frequency of a (possibly fractional) MIDI note number.
pub fn midi_to_hz(midi: f32) -> f32 {
    A4_HZ * 2f32.powf((midi - A4_MIDI) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_table_spellings() {
        for name in ["C", "C#", "E-", "B#", "C-", "F-", "E#", "G-"] {
            let class: PitchClass = name.parse().unwrap();
            assert_eq!(class.to_string(), name);
        }
        assert_eq!("C-".parse::<PitchClass>().unwrap().semitone(), -1);
        assert_eq!("B#".parse::<PitchClass>().unwrap().semitone(), 12);
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!("".parse::<PitchClass>(), Err(PitchError::Empty));
        assert!(matches!("H".parse::<PitchClass>(), Err(PitchError::UnknownStep(_))));
        assert!(matches!("C#-".parse::<PitchClass>(), Err(PitchError::BadAccidental(_))));
        assert!(matches!("Cx4".parse::<NamedPitch>(), Err(PitchError::BadOctave(_))));
    }

    #[test]
    fn midi_spelling_matches_key_table_convention() {
        assert_eq!(NamedPitch::from_midi(60).to_string(), "C4");
        assert_eq!(NamedPitch::from_midi(61).to_string(), "C#4");
        assert_eq!(NamedPitch::from_midi(63).to_string(), "E-4");
        assert_eq!(NamedPitch::from_midi(70).to_string(), "B-4");
        assert_eq!(NamedPitch::from_midi(59).to_string(), "B3");
        assert_eq!(NamedPitch::from_midi(0).to_string(), "C-1");
    }

    #[test]
    fn midi_respects_spelling_across_octave_edges() {
        assert_eq!("B#3".parse::<NamedPitch>().unwrap().midi(), 60);
        assert_eq!("C-4".parse::<NamedPitch>().unwrap().midi(), 59);
        assert_eq!("A4".parse::<NamedPitch>().unwrap().midi(), 69);
    }

    #[test]
    fn hz_conversions_agree_on_reference_pitches() {
        assert!((hz_to_midi(440.0) - 69.0).abs() < 1e-4);
        assert!((midi_to_hz(60.0) - 261.6256).abs() < 1e-2);
        assert_eq!(NamedPitch::from_hz(261.0).unwrap().to_string(), "C4");
        assert_eq!(NamedPitch::from_hz(0.0), None);
        assert_eq!(NamedPitch::from_hz(-5.0), None);
    }
}
