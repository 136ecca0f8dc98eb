//! Symbolic analysis types and the analysis report export

use crate::audio::TranscriptionState;
use serde::{Deserialize, Serialize};

/// Pitch class names (sharp spelling)
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert a frequency in Hz to a fractional MIDI note number
pub fn hz_to_midi(freq_hz: f32) -> f32 {
    69.0 + 12.0 * (freq_hz / 440.0).log2()
}

/// Convert a MIDI note number to frequency in Hz
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * 2.0f32.powf((midi - 69.0) / 12.0)
}

/// Pitch class (0 = C) of a rounded MIDI note
pub fn midi_pitch_class(midi: f32) -> u8 {
    (midi.round() as i32).rem_euclid(12) as u8
}

/// Detected onset
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Onset {
    /// Time in seconds
    pub time_sec: f32,
    /// Envelope value at the detection window
    pub strength: f32,
}

/// Per-onset pitch estimate. `frequency_hz == -1.0` marks an unvoiced or
/// silent window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PitchEstimate {
    pub time_sec: f32,
    pub frequency_hz: f32,
    pub confidence: f32,
}

impl PitchEstimate {
    pub const UNVOICED: f32 = -1.0;

    pub fn is_voiced(&self) -> bool {
        self.frequency_hz > 0.0
    }
}

/// Where the note list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteSource {
    /// Internal onset + YIN path
    AlgorithmicDetection,
    /// External note-detection model (bend arrays preserved)
    ModelDetection,
}

impl NoteSource {
    pub fn name(&self) -> &'static str {
        match self {
            NoteSource::AlgorithmicDetection => "algorithmic",
            NoteSource::ModelDetection => "model",
        }
    }
}

/// Unfretted note event, as produced by detection (either path)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNote {
    pub start_sec: f32,
    pub end_sec: f32,
    /// Fractional MIDI pitch
    pub pitch_midi: f32,
    /// Normalized velocity in [0, 1]
    pub velocity: f32,
    /// Per-frame pitch deviation from nominal, in cents. Empty on the
    /// algorithmic path.
    pub bend_cents: Vec<f32>,
}

impl RawNote {
    pub fn duration_sec(&self) -> f32 {
        (self.end_sec - self.start_sec).max(0.0)
    }
}

/// Position on the fretboard. String 0 is the high e string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FretPosition {
    pub string: u8,
    pub fret: u8,
}

/// Fretted, articulated note ready for tab encoding.
/// `bend_semitones > 0` and `has_vibrato` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub start_sec: f32,
    pub duration_sec: f32,
    pub pitch_midi: u8,
    pub velocity: f32,
    pub string: u8,
    pub fret: u8,
    pub bend_semitones: u8,
    pub has_vibrato: bool,
}

/// Tempo estimate (advisory)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoEstimate {
    pub bpm: f32,
    /// Number of envelope beats the estimate was derived from
    pub beat_count: usize,
    /// True when too few beats were found and the default tempo was used
    pub from_fallback: bool,
}

/// Key estimate (advisory, major keys only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// 0 = C
    pub pitch_class: u8,
    pub name: String,
}

impl KeyEstimate {
    pub fn major(pitch_class: u8) -> Self {
        let pc = pitch_class % 12;
        KeyEstimate {
            pitch_class: pc,
            name: format!("{} major", PITCH_CLASS_NAMES[pc as usize]),
        }
    }
}

/// Tab placement bookkeeping: placed + dropped equals the note count fed
/// to the encoder
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlacementStats {
    pub placed: usize,
    pub dropped: usize,
}

/// Pipeline outcome. "Nothing found" conditions are expected states the
/// caller renders, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionStatus {
    Complete,
    NoOnsetsFound,
    NoPitchedNotes,
}

impl TranscriptionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            TranscriptionStatus::Complete => "complete",
            TranscriptionStatus::NoOnsetsFound => "no-onsets-found",
            TranscriptionStatus::NoPitchedNotes => "no-pitched-notes",
        }
    }
}

/// Audio facts echoed into the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub total_samples: usize,
}

/// Stage-by-stage event counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineCounts {
    pub onsets: usize,
    pub raw_notes: usize,
    pub fretted_notes: usize,
    pub dropped_unmappable: usize,
    pub final_notes: usize,
    pub tab_placed: usize,
    pub tab_dropped: usize,
}

/// Full transcription report, serialized as analysis.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSummary {
    pub version: String,
    pub status: TranscriptionStatus,
    pub source: NoteSource,
    pub audio_info: AudioInfo,
    pub tempo: Option<TempoEstimate>,
    pub key: Option<KeyEstimate>,
    pub counts: PipelineCounts,
    pub notes: Vec<Note>,
    pub tab_text: Option<String>,
}

/// Build the summary from the final pipeline state
pub fn build_summary(state: &TranscriptionState) -> TranscriptionSummary {
    let placement = state.placement.unwrap_or_default();
    TranscriptionSummary {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: state.status,
        source: state.note_source,
        audio_info: AudioInfo {
            duration_seconds: state.duration_sec(),
            sample_rate: state.sr,
            total_samples: state.y.len(),
        },
        tempo: state.tempo.clone(),
        key: state.key.clone(),
        counts: PipelineCounts {
            onsets: state.onsets.len(),
            raw_notes: state.raw_notes.len(),
            fretted_notes: state.fretted_notes.len(),
            dropped_unmappable: state.dropped_unmappable,
            final_notes: state.notes.len(),
            tab_placed: placement.placed,
            tab_dropped: placement.dropped,
        },
        notes: state.notes.clone(),
        tab_text: state.tab_text.clone(),
    }
}

/// Export the analysis report to `<output_dir>/analysis.json`
pub fn export_analysis(
    state: &TranscriptionState,
    output_dir: &std::path::Path,
) -> crate::TabResult<()> {
    std::fs::create_dir_all(output_dir)?;

    let analysis_path = output_dir.join("analysis.json");
    let summary = build_summary(state);

    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&analysis_path, json)?;

    println!("Exported analysis results to {}", analysis_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_midi_conversions() {
        assert!((hz_to_midi(440.0) - 69.0).abs() < 1e-4);
        assert!((hz_to_midi(220.0) - 57.0).abs() < 1e-4);
        assert!((midi_to_hz(69.0) - 440.0).abs() < 1e-2);
        // Low E string
        assert!((midi_to_hz(40.0) - 82.41).abs() < 0.05);
    }

    #[test]
    fn test_pitch_class_wraps() {
        assert_eq!(midi_pitch_class(60.0), 0); // C4
        assert_eq!(midi_pitch_class(69.0), 9); // A4
        assert_eq!(midi_pitch_class(57.2), 9); // A3, slightly sharp
    }

    #[test]
    fn test_key_estimate_name() {
        let key = KeyEstimate::major(4);
        assert_eq!(key.name, "E major");
        assert_eq!(KeyEstimate::major(13).pitch_class, 1);
    }

    #[test]
    fn test_unvoiced_sentinel() {
        let est = PitchEstimate {
            time_sec: 0.0,
            frequency_hz: PitchEstimate::UNVOICED,
            confidence: 0.0,
        };
        assert!(!est.is_voiced());
    }
}
