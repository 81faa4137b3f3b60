//! # score_transcriber
//!
//! Key-aware transcription of audio into a single-part score: track pitches
//! frame by frame, keep the loud ones, snap them into a key, group them into
//! chords, merge repeated chords and export MusicXML.
//!
//! ## Example
//! ```rust
//! use score_transcriber::{assemble, extract, scale_for, PitchMatrix, Quantizer};
//!
//! fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1) A tiny pitch/magnitude matrix: 2 bins x 3 frames
//!     let matrix = PitchMatrix::from_columns(&[
//!         vec![(261.6, 50.0), (329.6, 40.0)], // C4 + E4
//!         vec![(262.0, 45.0), (330.0, 42.0)], // same chord again
//!         vec![(0.0, 0.0), (0.0, 0.0)],       // silence
//!     ])?;
//!
//!     // 2) One event per frame, magnitudes must exceed 30
//!     let raw = extract(&matrix, 512, 22_050, 1, 30.0)?;
//!
//!     // 3) Snap into C major and merge repeats
//!     let events = Quantizer::new(scale_for("C major")).quantize(&raw);
//!     assert_eq!(events.len(), 2);
//!
//!     // 4) Lay out the part
//!     let score = assemble(events);
//!     println!("{} events, {} quarters", score.events().len(),
//!              score.total_duration().quarter_length());
//!     Ok(())
//! }
//! # run().unwrap();
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

/// Audio file decoding.
pub mod audio;

/// Pipeline configuration.
pub mod config;

/// Frame chord extraction.
pub mod extractor;

/// Static key → scale table.
pub mod key_table;

/// MusicXML export.
pub mod musicxml;

/// End-to-end pipeline.
pub mod pipeline;

/// Spectral pitch tracking.
pub mod piptrack;

/// Pitch names and conversions.
pub mod pitch;

/// Chord quantization and merging.
pub mod quantizer;

/// Score events and assembly.
pub mod score;

/// Nearest in-scale pitch search.
pub mod snap;

pub use audio::{load_mono, AudioBuffer, AudioError};
pub use config::{Config, ConfigError};
pub use extractor::{extract, ExtractError, RawChordEvent};
pub use key_table::{scale_for, KeyScale};
pub use musicxml::{to_musicxml, write_musicxml, ExportError, ExportOptions};
pub use pipeline::{TranscribeError, Transcriber, Transcription};
pub use piptrack::{AnalysisError, PitchMatrix, PitchTracker, PitchTrackerBuilder};
pub use pitch::{NamedPitch, PitchClass, PitchError};
pub use quantizer::{quantize, Quantizer};
pub use score::{assemble, Duration, QuantizedChord, QuantizedRest, Score, ScoreEvent};
pub use snap::closest_in_scale;
