use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strum2tab::rhythm::{self, RhythmPattern};
use strum2tab::{chords, validate_input, Config, StrumToTab};

/// Guitar Tab Transcription System
#[derive(Parser)]
#[command(name = "strum2tab")]
#[command(about = "Transcribe plucked string recordings to tablature and render chord progressions to audio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an audio file to tablature
    Transcribe {
        /// Input audio file (WAV/AIFF)
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip QA plot generation
        #[arg(long)]
        no_qa: bool,

        /// Skip MIDI export
        #[arg(long)]
        no_midi: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Render a chord progression file to a WAV file
    Synthesize {
        /// Progression file (JSON: chords, optional bpm and pattern)
        progression: PathBuf,

        /// Output WAV file
        #[arg(short, long, default_value = "./progression.wav")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rhythm pattern: a built-in name or a JSON pattern file
        #[arg(short, long)]
        pattern: Option<String>,

        /// Override the progression's tempo
        #[arg(long)]
        bpm: Option<f32>,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn load_or_default(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => strum2tab::config::load_config(path),
        None => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transcribe {
            input,
            output,
            config,
            no_qa,
            no_midi,
            quiet,
        } => {
            let mut config = load_or_default(config)?;
            if no_qa {
                config.qa.enabled = false;
            }
            if no_midi {
                config.export.write_midi = false;
            }

            // Validate input
            validate_input(&input, &config)?;

            // Create processor
            let processor = StrumToTab::new(config);

            if !quiet {
                println!("Processing {}...", input.display());
            }

            let summary = processor.transcribe_file(&input, &output)?;

            if !quiet {
                println!(
                    "Transcription {}: {} notes ({} placed, {} dropped)",
                    summary.status.name(),
                    summary.counts.final_notes,
                    summary.counts.tab_placed,
                    summary.counts.tab_dropped
                );
                println!("Results saved to {}", output.display());
            }
        }
        Commands::Synthesize {
            progression,
            output,
            config,
            pattern,
            bpm,
        } => {
            let config = load_or_default(config)?;

            let mut progression = chords::load_progression(&progression)?;
            if bpm.is_some() {
                progression.bpm = bpm;
            }

            // A pattern argument names a built-in first, and otherwise is
            // read as a pattern file
            let pattern = match pattern {
                Some(arg) => Some(match RhythmPattern::builtin(&arg) {
                    Some(builtin) => builtin,
                    None => rhythm::load_pattern(&arg)?,
                }),
                None => None,
            };

            let processor = StrumToTab::new(config);
            processor.synthesize_to_wav(&progression, pattern.as_ref(), &output)?;
        }
        Commands::ValidateConfig { config } => {
            let config = strum2tab::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
