//! End-to-end pipeline tests: full transcriptions through all eight
//! passes, from synthetic buffers and from WAV files on disk.

use std::sync::Arc;

use strum2tab::analysis::{NoteSource, RawNote, TranscriptionStatus, TranscriptionSummary};
use strum2tab::fretboard::Tuning;
use strum2tab::model::NoteDetector;
use strum2tab::wav;
use strum2tab::{Config, PcmBuffer, StrumToTab, TabError, TabResult};

/// Add a decaying plucked-string tone at `start_sec`
fn add_pluck(samples: &mut [f32], sr: u32, start_sec: f32, freq: f32, amplitude: f32) {
    let start = (start_sec * sr as f32) as usize;
    for i in start..samples.len() {
        let t = (i - start) as f32 / sr as f32;
        let envelope = (-t * 4.0).exp();
        let fundamental = (2.0 * std::f32::consts::PI * freq * t).sin();
        let second = (2.0 * std::f32::consts::PI * freq * 2.0 * t).sin() * 0.4;
        let third = (2.0 * std::f32::consts::PI * freq * 3.0 * t).sin() * 0.2;
        samples[i] += amplitude * envelope * (fundamental + second + third);
    }
}

/// Mono clip with one pluck per (start_sec, freq) pair
fn pluck_clip(plucks: &[(f32, f32)], duration_sec: f32, sr: u32) -> Vec<f32> {
    let mut samples = vec![0.0; (duration_sec * sr as f32) as usize];
    for &(start, freq) in plucks {
        add_pluck(&mut samples, sr, start, freq, 0.5);
    }
    samples
}

/// Detector that returns a canned note list
struct FixedDetector {
    notes: Vec<RawNote>,
}

impl NoteDetector for FixedDetector {
    fn detect(&self, _pcm: &PcmBuffer) -> TabResult<Vec<RawNote>> {
        Ok(self.notes.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Detector whose backing endpoint is unreachable
struct OfflineDetector;

impl NoteDetector for OfflineDetector {
    fn detect(&self, _pcm: &PcmBuffer) -> TabResult<Vec<RawNote>> {
        Err(TabError::InferenceUnavailable(
            "model endpoint offline".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_plucks_transcribed_end_to_end() {
        let samples = pluck_clip(&[(0.0, 220.0), (1.0, 330.0)], 2.0, 44100);
        let pcm = PcmBuffer::mono(samples, 44100);

        let summary = StrumToTab::new(Config::default())
            .transcribe_buffer(&pcm)
            .unwrap();

        assert_eq!(summary.status, TranscriptionStatus::Complete);
        assert_eq!(summary.source, NoteSource::AlgorithmicDetection);
        assert!((summary.audio_info.duration_seconds - 2.0).abs() < 0.01);
        assert_eq!(summary.counts.onsets, 2);
        assert_eq!(summary.counts.final_notes, 2);

        // A3 then E4, at their pluck times
        let notes = &summary.notes;
        assert!(
            notes[0].start_sec.abs() < 0.05,
            "first note at {:.3}s, expected 0.0s",
            notes[0].start_sec
        );
        assert!(
            (notes[1].start_sec - 1.0).abs() < 0.05,
            "second note at {:.3}s, expected 1.0s",
            notes[1].start_sec
        );
        assert_eq!(notes[0].pitch_midi, 57);
        assert_eq!(notes[1].pitch_midi, 64);

        // Whatever positions were chosen, string + fret must reproduce the
        // pitch
        let tuning = Tuning::standard();
        for note in notes {
            assert_eq!(
                tuning.open_midi[note.string as usize] + note.fret,
                note.pitch_midi,
                "position ({}, {}) does not sound MIDI {}",
                note.string,
                note.fret,
                note.pitch_midi
            );
        }

        // Two attacks are too few beats for a measured tempo
        let tempo = summary.tempo.unwrap();
        assert!(tempo.from_fallback);

        let tab = summary.tab_text.unwrap();
        assert!(tab.starts_with("# strum2tab transcription"));
        assert_eq!(summary.counts.tab_placed, 2);
        assert_eq!(summary.counts.tab_dropped, 0);
    }

    #[test]
    fn test_noisy_recording_still_transcribes() {
        let mut samples = pluck_clip(&[(0.0, 220.0), (1.0, 330.0)], 2.0, 22050);
        for sample in samples.iter_mut() {
            *sample += (rand::random::<f32>() - 0.5) * 0.04; // Noise bed
        }
        let pcm = PcmBuffer::mono(samples, 22050);

        let summary = StrumToTab::new(Config::default())
            .transcribe_buffer(&pcm)
            .unwrap();

        assert_eq!(summary.status, TranscriptionStatus::Complete);
        assert_eq!(summary.counts.final_notes, 2, "noise added or lost notes");
        assert_eq!(summary.notes[0].pitch_midi, 57);
        assert_eq!(summary.notes[1].pitch_midi, 64);
    }

    #[test]
    fn test_silent_clip_reports_no_onsets() {
        let pcm = PcmBuffer::mono(vec![0.0; 44100], 22050);

        let summary = StrumToTab::new(Config::default())
            .transcribe_buffer(&pcm)
            .unwrap();

        assert_eq!(summary.status, TranscriptionStatus::NoOnsetsFound);
        assert_eq!(summary.counts.onsets, 0);
        assert_eq!(summary.counts.final_notes, 0);
        assert!(summary.tab_text.is_some(), "empty grid still renders");
    }

    #[test]
    fn test_cancellation_aborts_pipeline() {
        let processor = StrumToTab::new(Config::default());
        processor.cancel_token().cancel();

        let pcm = PcmBuffer::mono(pluck_clip(&[(0.0, 220.0)], 1.0, 22050), 22050);
        let result = processor.transcribe_buffer(&pcm);

        assert!(matches!(result, Err(TabError::Cancelled)));
    }

    #[test]
    fn test_detector_notes_flow_through_to_tab() {
        let detector = Arc::new(FixedDetector {
            notes: vec![
                RawNote {
                    start_sec: 0.5,
                    end_sec: 0.9,
                    pitch_midi: 57.0,
                    velocity: 0.8,
                    bend_cents: Vec::new(),
                },
                RawNote {
                    start_sec: 1.0,
                    end_sec: 1.4,
                    pitch_midi: 64.0,
                    velocity: 0.6,
                    bend_cents: Vec::new(),
                },
            ],
        });

        // Silent audio: the internal path would find nothing
        let pcm = PcmBuffer::mono(vec![0.0; 44100], 22050);
        let summary = StrumToTab::new(Config::default())
            .with_note_detector(detector)
            .transcribe_buffer(&pcm)
            .unwrap();

        assert_eq!(summary.status, TranscriptionStatus::Complete);
        assert_eq!(summary.source, NoteSource::ModelDetection);
        assert_eq!(summary.counts.final_notes, 2);
        assert_eq!(summary.counts.tab_placed, 2);
    }

    #[test]
    fn test_detector_failure_falls_back_to_internal_path() {
        let pcm = PcmBuffer::mono(pluck_clip(&[(0.5, 220.0)], 1.5, 22050), 22050);

        let summary = StrumToTab::new(Config::default())
            .with_note_detector(Arc::new(OfflineDetector))
            .transcribe_buffer(&pcm)
            .unwrap();

        assert_eq!(summary.status, TranscriptionStatus::Complete);
        assert_eq!(summary.source, NoteSource::AlgorithmicDetection);
        assert_eq!(summary.counts.final_notes, 1);
        assert_eq!(summary.notes[0].pitch_midi, 57);
    }

    #[test]
    fn test_transcribe_file_writes_artifacts() {
        let dir = std::env::temp_dir().join(format!("strum2tab_e2e_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input_path = dir.join("input.wav");
        let output_dir = dir.join("out");

        let pcm = PcmBuffer::mono(pluck_clip(&[(0.0, 220.0), (1.0, 330.0)], 2.0, 44100), 44100);
        wav::write_file(&pcm, &input_path).unwrap();

        let mut config = Config::default();
        config.qa.enabled = false; // Plot rendering needs fonts the test host may lack
        let summary = StrumToTab::new(config)
            .transcribe_file(&input_path, &output_dir)
            .unwrap();

        assert_eq!(summary.status, TranscriptionStatus::Complete);
        assert!(output_dir.join("tab.txt").exists());
        assert!(output_dir.join("transcription.mid").exists());

        // The JSON report must deserialize back into the summary type
        let json = std::fs::read_to_string(output_dir.join("analysis.json")).unwrap();
        let parsed: TranscriptionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, TranscriptionStatus::Complete);
        assert_eq!(parsed.counts.final_notes, summary.counts.final_notes);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_validate_input_rejects_missing_file() {
        let config = Config::default();
        let result = strum2tab::validate_input("/nonexistent/strum2tab_missing.wav", &config);
        assert!(result.is_err());
    }
}
