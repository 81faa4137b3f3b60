//! End-to-end transcription: audio → pitch matrix → chord events → score → MusicXML.

use crate::audio::{self, AudioBuffer, AudioError};
use crate::config::{validate_config, Config, ConfigError};
use crate::extractor::{extract, ExtractError, RawChordEvent};
use crate::key_table::{scale_for, KeyScale};
use crate::musicxml::{write_musicxml, ExportError, ExportOptions};
use crate::piptrack::{AnalysisError, PitchMatrix, PitchTracker};
use crate::quantizer::Quantizer;
use crate::score::{assemble, Score};
use log::{debug, info};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Any failure of a transcription run.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The audio could not be loaded.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// The pitch tracker could not be set up.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Chord extraction was given bad parameters.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The score could not be written.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The raw event dump could not be written.
    #[error("failed to write events to {}: {}", .path.display(), .message)]
    EventsDump {
        /// Destination of the dump.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

/// Intermediate and final products of one run.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// One event per visited analysis frame.
    pub raw_events: Vec<RawChordEvent>,
    /// The assembled score.
    pub score: Score,
}

/// Runs the whole pipeline for one configuration.
pub struct Transcriber {
    config: Config,
    scale: KeyScale,
}

impl Transcriber {
    /// Create a transcriber, validating the configuration.
    pub fn new(config: Config) -> Result<Self, TranscribeError> {
        validate_config(&config)?;
        let scale = scale_for(&config.key);
        Ok(Transcriber { config, scale })
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The scale pitches are snapped into (empty for unknown keys).
    pub fn scale(&self) -> &KeyScale {
        &self.scale
    }

    /// Analyse mono samples and build a score.
    ///
    /// The samples are first resampled to the configured analysis rate, so a
    /// frame spans the same time whatever rate the recording was made at.
    pub fn transcribe_samples(
        &self,
        audio: &AudioBuffer,
    ) -> Result<Transcription, TranscribeError> {
        let analysis = &self.config.analysis;
        let audio = audio.resample(analysis.sample_rate)?;
        let mut tracker = PitchTracker::builder()
            .n_fft(analysis.n_fft)
            .hop_length(analysis.hop_length)
            .sample_rate(audio.sample_rate)
            .fmin(analysis.fmin)
            .fmax(analysis.fmax)
            .threshold(analysis.threshold)
            .build()?;

        let matrix = tracker.track(&audio.samples);
        info!(
            "pitch tracking produced {} frames x {} bins",
            matrix.frames(),
            matrix.bins()
        );
        self.transcribe_matrix(&matrix, audio.sample_rate)
    }

    /// Build a score from an existing pitch/magnitude matrix.
    pub fn transcribe_matrix(
        &self,
        matrix: &PitchMatrix,
        sample_rate: u32,
    ) -> Result<Transcription, TranscribeError> {
        let raw_events = extract(
            matrix,
            self.config.analysis.hop_length,
            sample_rate,
            self.config.skip_factor,
            self.config.amplitude_threshold as f32,
        )?;

        let chords = raw_events.iter().filter(|e| !e.is_rest()).count();
        info!(
            "{} frames kept ({} with pitches, {} silent)",
            raw_events.len(),
            chords,
            raw_events.len() - chords
        );

        let events = Quantizer::new(self.scale).quantize(&raw_events);
        let score = assemble(events);
        info!(
            "score has {} events spanning {} quarter notes in `{}`",
            score.events().len(),
            score.total_duration().quarter_length(),
            self.config.key
        );

        Ok(Transcription { raw_events, score })
    }

    /// Load `input`, transcribe it and write MusicXML to `output`.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<Transcription, TranscribeError> {
        let audio = audio::load_mono(input)?;
        let transcription = self.transcribe_samples(&audio)?;

        let options = ExportOptions {
            title: self.config.title.clone(),
            ..ExportOptions::default()
        };
        write_musicxml(&transcription.score, output, &options)?;
        Ok(transcription)
    }
}

/// Write raw chord events as pretty JSON.
pub fn write_events_json<P: AsRef<Path>>(
    events: &[RawChordEvent],
    path: P,
) -> Result<(), TranscribeError> {
    let path = path.as_ref();
    let fail = |message: String| TranscribeError::EventsDump {
        path: path.to_path_buf(),
        message,
    };
    let json = serde_json::to_string_pretty(events).map_err(|e| fail(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| fail(e.to_string()))?;
    debug!("dumped {} raw events to {}", events.len(), path.display());
    Ok(())
}
