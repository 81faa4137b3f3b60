//! Pitch Snapper
//!
//! Nearest in-key spelling for an arbitrary pitch class.

use crate::key_table::KeyScale;
use crate::pitch::{NamedPitch, PitchClass, CANONICAL_OCTAVE};

/// Find the scale member closest to `class` in semitones.
///
/// Input and candidates are compared at the same octave, so only pitch-class
/// distance counts; note that spellings such as `B#` or `C-` cross into the
/// neighbouring octave and are measured that way. The first candidate with the
/// minimum distance in the scale's declared order wins.
///
/// Returns `None` when the scale is empty, leaving the caller to pass the pitch
/// through unchanged.
pub fn closest_in_scale(class: PitchClass, scale: &KeyScale) -> Option<PitchClass> {
    let target = NamedPitch::new(class, CANONICAL_OCTAVE).midi();

    let mut best: Option<(PitchClass, i32)> = None;
    for candidate in scale.iter().filter_map(|name| name.parse::<PitchClass>().ok()) {
        let distance = (NamedPitch::new(candidate, CANONICAL_OCTAVE).midi() - target).abs();
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Keep `pitch` if its class is in the scale, else swap in the closest member
/// at the same octave number. Empty scales pass everything through.
pub fn snap_pitch(pitch: NamedPitch, scale: &KeyScale) -> NamedPitch {
    if scale.is_empty() || scale.contains_class(pitch.class) {
        return pitch;
    }
    match closest_in_scale(pitch.class, scale) {
        Some(class) => pitch.with_class(class),
        None => pitch,
    }
}
