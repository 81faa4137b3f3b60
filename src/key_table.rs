//! Key Table
//!
//! Fixed mapping from key names (`"C major"`, `"E- minor"`, …) to the ordered
//! pitch-class spellings of their scale.

use crate::pitch::PitchClass;
use lazy_static::lazy_static;
use log::warn;
use std::collections::HashMap;

/// Name of the catch-all key that admits every chromatic pitch class.
pub const DEFAULT_KEY: &str = "default";

/// (key name, scale spellings) in declaration order.
const KEYS: &[(&str, &[&str])] = &[
    ("C major", &["C", "D", "E", "F", "G", "A", "B"]),
    ("C# major", &["C#", "D#", "E#", "F#", "G#", "A#", "B#"]),
    ("D major", &["D", "E", "F#", "G", "A", "B", "C#"]),
    ("E- major", &["E-", "F", "G", "A-", "B-", "C", "D"]),
    ("E major", &["E", "F#", "G#", "A", "B", "C#", "D#"]),
    ("F major", &["F", "G", "A", "B-", "C", "D", "E"]),
    ("F# major", &["F#", "G#", "A#", "B", "C#", "D#", "E#"]),
    ("G major", &["G", "A", "B", "C", "D", "E", "F#"]),
    ("A- major", &["A-", "B-", "C", "D-", "E-", "F", "G"]),
    ("A major", &["A", "B", "C#", "D", "E", "F#", "G#"]),
    ("B- major", &["B-", "C", "D", "E-", "F", "G", "A"]),
    ("B major", &["B", "C#", "D#", "E", "F#", "G#", "A#"]),
    ("C minor", &["C", "D", "E-", "F", "G", "A-", "B-"]),
    ("C# minor", &["C#", "D#", "E", "F#", "G#", "A", "B"]),
    ("D minor", &["D", "E", "F", "G", "A", "B-", "C"]),
    ("E- minor", &["E-", "F", "G-", "A-", "B-", "C-", "D-"]),
    ("E minor", &["E", "F#", "G", "A", "B", "C", "D"]),
    ("F minor", &["F", "G", "A-", "B-", "C", "D-", "E-"]),
    ("F# minor", &["F#", "G#", "A", "B", "C#", "D", "E"]),
    ("G minor", &["G", "A", "B-", "C", "D", "E-", "F"]),
    ("A- minor", &["A-", "B-", "C-", "D-", "E-", "F-", "G-"]),
    ("A minor", &["A", "B", "C", "D", "E", "F", "G"]),
    ("B- minor", &["B-", "C", "D-", "E-", "F-", "G-", "A-"]),
    ("B minor", &["B", "C#", "D", "E", "F#", "G", "A"]),
    (
        DEFAULT_KEY,
        &[
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B", "B-", "A-", "G-",
            "F-", "E-", "D-", "C-", "B#", "E#", "F#", "A#",
        ],
    ),
];

lazy_static! {
    static ref TABLE: HashMap<&'static str, &'static [&'static str]> =
        KEYS.iter().copied().collect();
}

/// Ordered set of pitch-class spellings admitted by a key.
///
/// The declared order doubles as the tie-break priority when snapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyScale {
    names: &'static [&'static str],
}

impl KeyScale {
    /// A scale that admits nothing (unknown key).
    pub const fn empty() -> Self {
        KeyScale { names: &[] }
    }

    /// Spellings in declaration order.
    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Number of listed spellings.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True for the scale of an unknown key.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `name` is spelled exactly as one of the scale members.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name)
    }

    /// Whether the spelling of `class` is a scale member.
    pub fn contains_class(&self, class: PitchClass) -> bool {
        self.contains(&class.to_string())
    }

    /// Iterate the spellings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }
}

/// Look up the scale of a key. Unknown names yield an empty scale.
pub fn scale_for(key_name: &str) -> KeyScale {
    match TABLE.get(key_name) {
        Some(names) => KeyScale { names: *names },
        None => {
            warn!("unknown key `{key_name}`, pitches will not be snapped");
            KeyScale::empty()
        }
    }
}

/// Whether `key_name` is present in the table.
pub fn is_known_key(key_name: &str) -> bool {
    TABLE.contains_key(key_name)
}

/// All key names in declaration order.
pub fn key_names() -> impl Iterator<Item = &'static str> {
    KEYS.iter().map(|(name, _)| *name)
}
