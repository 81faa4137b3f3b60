//! Configuration for the transcription pipeline

use crate::key_table;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The amplitude threshold text is not a non-negative integer.
    #[error("invalid amplitude threshold `{0}`: expected a non-negative integer")]
    InvalidThreshold(String),

    /// A parameter is out of range.
    #[error("invalid configuration parameter `{param}`: {msg}")]
    InvalidParameter {
        /// Name of the offending parameter.
        param: &'static str,
        /// Why it was rejected.
        msg: String,
    },

    /// The configuration file could not be read or written.
    #[error("config file {}: {}", .path.display(), .source)]
    Io {
        /// The configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`Config`].
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key the pitches are snapped into, e.g. `"C minor"`.
    pub key: String,
    /// Spectral magnitude a bin must exceed to count as sounding.
    pub amplitude_threshold: u32,
    /// Keep every n-th analysis frame.
    pub skip_factor: usize,
    /// Pitch tracker settings.
    pub analysis: AnalysisConfig,
    /// Audio file to transcribe.
    pub input: PathBuf,
    /// MusicXML destination.
    pub output: PathBuf,
    /// Work title written into the score.
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key: "C major".to_string(),
            amplitude_threshold: 3,
            skip_factor: 6,
            analysis: AnalysisConfig::default(),
            input: PathBuf::from("input.wav"),
            output: PathBuf::from("output_score.xml"),
            title: "Transcription".to_string(),
        }
    }
}

/// Pitch tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rate audio is resampled to before analysis, Hz.
    pub sample_rate: u32,
    /// FFT window length in samples.
    pub n_fft: usize,
    /// Samples between frames.
    pub hop_length: usize,
    /// Lowest frequency considered, Hz.
    pub fmin: f32,
    /// Highest frequency considered (exclusive), Hz.
    pub fmax: f32,
    /// Per-frame peak threshold relative to the loudest bin.
    pub threshold: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            n_fft: 2048,
            hop_length: 512,
            fmin: 150.0,
            fmax: 4000.0,
            threshold: 0.1,
        }
    }
}

/// Check ranges. An unknown key is allowed but logged.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.skip_factor == 0 {
        return Err(ConfigError::InvalidParameter {
            param: "skip_factor",
            msg: "must be >= 1".to_string(),
        });
    }

    let analysis = &config.analysis;
    if analysis.sample_rate == 0 {
        return Err(ConfigError::InvalidParameter {
            param: "analysis.sample_rate",
            msg: "must be > 0".to_string(),
        });
    }
    if analysis.n_fft < 4 {
        return Err(ConfigError::InvalidParameter {
            param: "analysis.n_fft",
            msg: format!("{} is too small", analysis.n_fft),
        });
    }
    if analysis.hop_length == 0 || analysis.hop_length > analysis.n_fft {
        return Err(ConfigError::InvalidParameter {
            param: "analysis.hop_length",
            msg: format!("must be in 1..={}", analysis.n_fft),
        });
    }
    let band_ok =
        analysis.fmin >= 0.0 && analysis.fmax.is_finite() && analysis.fmin < analysis.fmax;
    if !band_ok {
        return Err(ConfigError::InvalidParameter {
            param: "analysis.fmin",
            msg: format!(
                "need 0 <= fmin < fmax, got {} and {}",
                analysis.fmin, analysis.fmax
            ),
        });
    }

    if !key_table::is_known_key(&config.key) {
        warn!(
            "key `{}` is not in the key table; pitches will be left unsnapped",
            config.key
        );
    }

    Ok(())
}

/// Parse a threshold typed by the user.
pub fn parse_threshold(text: &str) -> Result<u32, ConfigError> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidThreshold(text.trim().to_string()))
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
