use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use score_transcriber::config::{self, parse_threshold, Config};
use score_transcriber::{key_table, pipeline, Transcriber};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

/// Audio-to-score transcription
#[derive(Parser)]
#[command(name = "score-transcriber")]
#[command(about = "Transcribe an audio recording into a key-quantized MusicXML score")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an audio file (WAV/Ogg) into MusicXML
    Transcribe {
        /// Input audio file
        input: Option<PathBuf>,

        /// Output MusicXML file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Musical key, e.g. "C minor" (see `list-keys`)
        #[arg(short, long)]
        key: Option<String>,

        /// Magnitude a spectral peak must exceed, e.g. 30
        #[arg(short = 't', long)]
        threshold: Option<String>,

        /// Keep every n-th analysis frame
        #[arg(short, long)]
        skip: Option<usize>,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also dump the raw per-frame chord events as JSON
        #[arg(long)]
        events_json: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show default configuration
    ShowConfig,
    /// List the keys pitches can be snapped into
    ListKeys,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transcribe {
            input,
            output,
            key,
            threshold,
            skip,
            config,
            events_json,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }
            init_logging(if verbose {
                "debug"
            } else if quiet {
                "warn"
            } else {
                "info"
            });

            let from_file = config.is_some();
            let mut config = match config {
                Some(path) => config::load_config(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => Config::default(),
            };

            if let Some(input) = input {
                config.input = input;
            }
            if let Some(output) = output {
                config.output = output;
            }
            if let Some(skip) = skip {
                config.skip_factor = skip;
            }

            let interactive = is_interactive(from_file, io::stdin().is_terminal());
            match resolve(key, interactive) {
                Setting::Given(key) => config.key = key,
                Setting::Prompt => config.key = prompt("Key (e.g. 'C minor'): ")?,
                Setting::Keep => {}
            }
            let threshold = match resolve(threshold, interactive) {
                Setting::Given(text) => Some(text),
                Setting::Prompt => Some(prompt("Noise threshold (e.g. '30'): ")?),
                Setting::Keep => None,
            };
            if let Some(text) = threshold {
                config.amplitude_threshold = parse_threshold(&text)?;
            }

            let transcriber = Transcriber::new(config)?;
            let config = transcriber.config();
            info!(
                "transcribing {} in `{}` (threshold {}, skip {})",
                config.input.display(),
                config.key,
                config.amplitude_threshold,
                config.skip_factor
            );

            let transcription = transcriber
                .process(&config.input, &config.output)
                .with_context(|| format!("transcribing {}", config.input.display()))?;

            if let Some(path) = events_json {
                pipeline::write_events_json(&transcription.raw_events, &path)?;
            }

            if !quiet {
                println!("Score saved to {}", config.output.display());
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        Commands::ListKeys => {
            for name in key_table::key_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Where a setting left off the command line comes from.
#[derive(Debug, PartialEq, Eq)]
enum Setting<T> {
    /// Passed as a flag.
    Given(T),
    /// Asked for on the terminal.
    Prompt,
    /// Left as configured.
    Keep,
}

fn resolve<T>(given: Option<T>, interactive: bool) -> Setting<T> {
    match given {
        Some(value) => Setting::Given(value),
        None if interactive => Setting::Prompt,
        None => Setting::Keep,
    }
}

/// Prompt only when no config file was given and a person is at the terminal.
fn is_interactive(config_file_given: bool, stdin_is_terminal: bool) -> bool {
    !config_file_given && stdin_is_terminal
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn prompt(question: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{question}")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
