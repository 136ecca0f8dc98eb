//! Guitar Tab Transcription System
//!
//! A deterministic audio signal processing pipeline that turns plucked
//! string recordings into ASCII tablature, plus an additive synthesis
//! engine that renders symbolic chord progressions back to audio.

pub mod analysis;
pub mod audio;
pub mod chords;
pub mod config;
pub mod dsp;
pub mod error;
pub mod fretboard;
pub mod midi;
pub mod mixer;
pub mod model;
pub mod passes;
pub mod qa;
pub mod rhythm;
pub mod synth;
pub mod tab;
pub mod wav;

pub use analysis::TranscriptionSummary;
pub use audio::{CancelToken, PcmBuffer, TranscriptionState};
pub use config::Config;
pub use error::{Result as TabResult, TabError};
pub use model::NoteDetector;

use chords::Progression;
use rhythm::RhythmPattern;
use std::path::Path;
use std::sync::Arc;

/// Main processing pipeline for audio-to-tab conversion
pub struct StrumToTab {
    config: Config,
    detector: Option<Arc<dyn NoteDetector>>,
    cancel: CancelToken,
}

impl StrumToTab {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            detector: None,
            cancel: CancelToken::new(),
        }
    }

    /// Attach an external note detector. Its output replaces the internal
    /// onset + pitch path; on detector failure the pipeline falls back.
    pub fn with_note_detector(mut self, detector: Arc<dyn NoteDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Token shared with every transcription started by this processor.
    /// Cancelling it makes in-flight pipelines stop between work units.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Transcribe an audio file and write tab, MIDI, and analysis output
    pub fn transcribe_file<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: P,
    ) -> TabResult<TranscriptionSummary> {
        let mut state = TranscriptionState::load(input_path, &self.config)?;
        state.cancel = self.cancel.clone();

        self.run_pipeline(&mut state)?;
        self.export_results(&state, output_dir.as_ref())?;

        Ok(analysis::build_summary(&state))
    }

    /// Transcribe an in-memory buffer without touching the filesystem
    pub fn transcribe_buffer(&self, pcm: &PcmBuffer) -> TabResult<TranscriptionSummary> {
        let mut state = TranscriptionState::from_buffer(pcm, &self.config);
        state.cancel = self.cancel.clone();

        self.run_pipeline(&mut state)?;

        Ok(analysis::build_summary(&state))
    }

    /// Execute the complete multi-pass pipeline
    fn run_pipeline(&self, state: &mut TranscriptionState) -> TabResult<()> {
        // Pass 0: Preflight & Conditioning
        passes::pass_0::run(state, &self.config)?;

        // Pass 1: Onset Detection
        passes::pass_1::run(state, &self.config)?;

        // Pass 2: Note Acquisition (model or internal path)
        passes::pass_2::run(state, &self.config, self.detector.as_deref())?;

        // Pass 3: Tempo & Key Estimation
        passes::pass_3::run(state, &self.config)?;

        // Pass 4: Raw Note Consolidation
        passes::pass_4::run(state, &self.config)?;

        // Pass 5: Fret Mapping
        passes::pass_5::run(state, &self.config)?;

        // Pass 6: Note Deduplication
        passes::pass_6::run(state, &self.config)?;

        // Pass 7: Tab Encoding
        passes::pass_7::run(state, &self.config)?;

        Ok(())
    }

    /// Export tab text, MIDI, analysis, and QA results
    fn export_results(&self, state: &TranscriptionState, output_dir: &Path) -> TabResult<()> {
        std::fs::create_dir_all(output_dir)?;

        if let Some(tab_text) = &state.tab_text {
            let tab_path = output_dir.join("tab.txt");
            std::fs::write(&tab_path, tab_text)?;
            println!("Exported tab to {}", tab_path.display());
        }

        if self.config.export.write_midi {
            midi::export_midi(state, output_dir, &self.config)?;
        }
        if self.config.export.write_analysis {
            analysis::export_analysis(state, output_dir)?;
        }
        if self.config.qa.enabled {
            qa::generate_artifacts(state, output_dir, &self.config)?;
        }

        Ok(())
    }

    /// Render a chord progression to a stereo WAV file. The pattern
    /// argument overrides any pattern named in the progression itself.
    pub fn synthesize_to_wav<P: AsRef<Path>>(
        &self,
        progression: &Progression,
        pattern: Option<&RhythmPattern>,
        output_path: P,
    ) -> TabResult<()> {
        let bpm = progression.bpm.unwrap_or(self.config.tempo.fallback_bpm);

        let named_pattern = match (&pattern, &progression.pattern) {
            (None, Some(name)) => Some(RhythmPattern::builtin(name).ok_or_else(|| {
                TabError::InputValidationError(format!(
                    "unknown rhythm pattern '{}' (built-ins: {})",
                    name,
                    RhythmPattern::builtin_names().join(", ")
                ))
            })?),
            _ => None,
        };
        let pattern = pattern.or(named_pattern.as_ref());

        let buffer = synth::synthesize_progression(
            &progression.chords,
            pattern,
            bpm,
            self.config.audio.render_rate,
            &self.config.synth,
        )?;

        wav::write_file(&buffer, output_path.as_ref())?;
        println!(
            "Synthesized {} chords ({:.1}s at {:.0} BPM) to {}",
            progression.chords.len(),
            buffer.duration_sec(),
            bpm,
            output_path.as_ref().display()
        );

        Ok(())
    }
}

/// Validate configuration and input files
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> TabResult<()> {
    // Check input file exists and is valid audio
    audio::validate_audio_file(input_path, config)?;

    // Validate configuration
    config::validate_config(config)?;

    Ok(())
}
