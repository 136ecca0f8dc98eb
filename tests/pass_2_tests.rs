//! Comprehensive validation tests for Pass 2: Note Acquisition

use std::f32::consts::PI;
use strum2tab::analysis::{NoteSource, RawNote, TranscriptionStatus};
use strum2tab::audio::{PcmBuffer, TranscriptionState};
use strum2tab::config::Config;
use strum2tab::error::TabError;
use strum2tab::model::NoteDetector;
use strum2tab::passes::{pass_0, pass_1, pass_2};
use strum2tab::TabResult;

/// Add a decaying plucked-string tone into a sample buffer
fn add_pluck(audio: &mut [f32], sr: u32, start_sec: f32, freq: f32, amplitude: f32) {
    let start = (start_sec * sr as f32).round() as usize;
    for i in start..audio.len() {
        let t = (i - start) as f32 / sr as f32;
        let envelope = (-t * 4.0).exp();
        let fundamental = (2.0 * PI * freq * t).sin();
        let second = 0.4 * (2.0 * PI * freq * 2.0 * t).sin();
        let third = 0.2 * (2.0 * PI * freq * 3.0 * t).sin();
        audio[i] += (fundamental + second + third) * envelope * amplitude;
    }
}

/// Build a clip of plucks given as (start_sec, freq, amplitude) triples
fn pluck_clip(events: &[(f32, f32, f32)], duration_sec: f32, sr: u32) -> Vec<f32> {
    let mut audio = vec![0.0; (duration_sec * sr as f32) as usize];
    for &(start_sec, freq, amplitude) in events {
        add_pluck(&mut audio, sr, start_sec, freq, amplitude);
    }
    audio
}

fn prepared_state(samples: Vec<f32>, sr: u32, config: &Config) -> TranscriptionState {
    let mut state = TranscriptionState::from_test_samples(samples, sr);
    pass_0::run(&mut state, config).unwrap();
    pass_1::run(&mut state, config).unwrap();
    state
}

fn raw(start_sec: f32, end_sec: f32, pitch_midi: f32, velocity: f32) -> RawNote {
    RawNote {
        start_sec,
        end_sec,
        pitch_midi,
        velocity,
        bend_cents: Vec::new(),
    }
}

/// Detector stub that returns a fixed note list
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

/// Detector stub that always fails
struct OfflineDetector;

impl NoteDetector for OfflineDetector {
    fn detect(&self, _pcm: &PcmBuffer) -> TabResult<Vec<RawNote>> {
        Err(TabError::InferenceUnavailable(
            "model endpoint offline".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pluck_pitch_within_two_percent() {
        let sr = 22050;
        let samples = pluck_clip(&[(0.2, 220.0, 0.5)], 1.5, sr);
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);

        pass_2::run(&mut state, &config, None).unwrap();

        assert_eq!(state.raw_notes.len(), 1);
        let est = &state.pitch_estimates[0];
        assert!(est.is_voiced(), "estimate should be voiced: {:?}", est);
        let relative_error = (est.frequency_hz - 220.0).abs() / 220.0;
        assert!(
            relative_error < 0.02,
            "pitch {:.2} Hz off by {:.1}%",
            est.frequency_hz,
            relative_error * 100.0
        );
        assert!(est.confidence > 0.0);
        // MIDI pitch within a third of a semitone of A3
        assert!((state.raw_notes[0].pitch_midi - 57.0).abs() < 0.35);
        assert_eq!(state.note_source, NoteSource::AlgorithmicDetection);
    }

    #[test]
    fn test_sustain_truncated_by_next_onset() {
        let sr = 22050;
        let samples = pluck_clip(&[(0.3, 220.0, 0.5), (1.0, 330.0, 0.5)], 2.0, sr);
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);

        pass_2::run(&mut state, &config, None).unwrap();

        assert_eq!(state.raw_notes.len(), 2);
        let second_onset = state.onsets[1].time_sec;
        assert!(
            (state.raw_notes[0].end_sec - second_onset).abs() < 1e-6,
            "first note should end at the next onset, ended at {:.3}",
            state.raw_notes[0].end_sec
        );
        // Last note runs to the end of the clip; the sustain cap is longer
        assert!((state.raw_notes[1].end_sec - state.duration_sec()).abs() < 1e-6);
        assert!((state.raw_notes[1].pitch_midi - 64.0).abs() < 0.4);
    }

    #[test]
    fn test_lone_note_capped_by_sustain_limit() {
        let sr = 22050;
        let samples = pluck_clip(&[(0.2, 220.0, 0.5)], 3.0, sr);
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);

        pass_2::run(&mut state, &config, None).unwrap();

        assert_eq!(state.raw_notes.len(), 1);
        let note = &state.raw_notes[0];
        assert!(
            (note.duration_sec() - config.notes.max_sustain_sec).abs() < 0.05,
            "duration {:.3}s should hit the sustain cap",
            note.duration_sec()
        );
    }

    #[test]
    fn test_onset_into_silence_reported_unvoiced() {
        let sr = 22050;
        // The pluck is cut off 20 ms in, before the offset analysis window
        let mut samples = vec![0.0; sr as usize];
        add_pluck(&mut samples, sr, 0.2, 220.0, 0.5);
        let cut = (0.22 * sr as f32) as usize;
        for s in samples[cut..].iter_mut() {
            *s = 0.0;
        }
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);
        assert_eq!(state.onsets.len(), 1);

        pass_2::run(&mut state, &config, None).unwrap();

        assert_eq!(state.pitch_estimates.len(), 1);
        assert!(!state.pitch_estimates[0].is_voiced());
        assert!(state.raw_notes.is_empty());
        assert_eq!(state.status, TranscriptionStatus::NoPitchedNotes);
    }

    #[test]
    fn test_velocity_tracks_onset_strength() {
        let sr = 22050;
        let samples = pluck_clip(
            &[(0.3, 220.0, 0.5), (0.9, 220.0, 0.25), (1.5, 220.0, 0.12)],
            2.2,
            sr,
        );
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);
        assert_eq!(state.onsets.len(), 3);

        pass_2::run(&mut state, &config, None).unwrap();

        assert_eq!(state.raw_notes.len(), 3);
        let v: Vec<f32> = state.raw_notes.iter().map(|n| n.velocity).collect();
        for &velocity in &v {
            assert!(
                (config.notes.velocity_floor..=config.notes.velocity_ceil).contains(&velocity),
                "velocity {} outside configured range",
                velocity
            );
        }
        // Strongest onset maps to the ceiling, quieter plucks fall below it
        assert!((v[0] - config.notes.velocity_ceil).abs() < 1e-5);
        assert!(v[1] < v[0], "velocities {:?} should decrease", v);
        assert!(v[2] < v[1], "velocities {:?} should decrease", v);
    }

    #[test]
    fn test_detector_output_replaces_internal_path() {
        let sr = 22050;
        let samples = pluck_clip(&[(0.3, 220.0, 0.5)], 1.5, sr);
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);

        // Unsorted, with one broken note and one out-of-range velocity
        let detector = FixedDetector {
            notes: vec![
                raw(1.0, 1.4, 64.0, 3.0),
                raw(0.2, 0.8, 57.0, 0.8),
                raw(0.5, 0.9, f32::NAN, 0.5),
            ],
        };

        pass_2::run(&mut state, &config, Some(&detector)).unwrap();

        assert_eq!(state.note_source, NoteSource::ModelDetection);
        assert_eq!(state.raw_notes.len(), 2, "broken note must be dropped");
        assert!(state.raw_notes[0].start_sec < state.raw_notes[1].start_sec);
        assert!(
            state.raw_notes[1].velocity <= 1.0,
            "velocity must be clamped, got {}",
            state.raw_notes[1].velocity
        );
        assert_eq!(state.status, TranscriptionStatus::Complete);
    }

    #[test]
    fn test_failing_detector_falls_back_to_internal_path() {
        let sr = 22050;
        let samples = pluck_clip(&[(0.3, 220.0, 0.5)], 1.5, sr);
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);

        pass_2::run(&mut state, &config, Some(&OfflineDetector)).unwrap();

        assert_eq!(state.note_source, NoteSource::AlgorithmicDetection);
        assert_eq!(state.raw_notes.len(), 1);
        assert!((state.raw_notes[0].pitch_midi - 57.0).abs() < 0.35);
    }

    #[test]
    fn test_detector_success_supersedes_empty_onset_scan() {
        let sr = 22050;
        let samples = vec![0.0; sr as usize];
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);
        assert_eq!(state.status, TranscriptionStatus::NoOnsetsFound);

        let detector = FixedDetector {
            notes: vec![raw(0.1, 0.5, 60.0, 0.7)],
        };
        pass_2::run(&mut state, &config, Some(&detector)).unwrap();

        assert_eq!(state.note_source, NoteSource::ModelDetection);
        assert_eq!(state.raw_notes.len(), 1);
        assert_eq!(state.status, TranscriptionStatus::Complete);
    }

    #[test]
    fn test_detector_returning_garbage_means_no_notes() {
        let sr = 22050;
        let samples = pluck_clip(&[(0.3, 220.0, 0.5)], 1.5, sr);
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);

        // Inverted and zero-length notes are all filtered out
        let detector = FixedDetector {
            notes: vec![raw(1.0, 0.5, 60.0, 0.7), raw(0.4, 0.4, 62.0, 0.7)],
        };
        pass_2::run(&mut state, &config, Some(&detector)).unwrap();

        assert_eq!(state.note_source, NoteSource::ModelDetection);
        assert!(state.raw_notes.is_empty());
        assert_eq!(state.status, TranscriptionStatus::NoPitchedNotes);
    }

    #[test]
    fn test_empty_detector_result_keeps_onset_scan_labeling() {
        let sr = 22050;
        let samples = vec![0.0; sr as usize];
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);
        assert_eq!(state.status, TranscriptionStatus::NoOnsetsFound);

        // Detector agrees there is nothing here; the report must not
        // claim a model source for a result the onset scan produced
        let detector = FixedDetector { notes: Vec::new() };
        pass_2::run(&mut state, &config, Some(&detector)).unwrap();

        assert_eq!(state.note_source, NoteSource::AlgorithmicDetection);
        assert!(state.raw_notes.is_empty());
        assert_eq!(state.status, TranscriptionStatus::NoOnsetsFound);
    }

    #[test]
    fn test_cancellation_inside_pitch_loop() {
        let sr = 22050;
        let samples = pluck_clip(&[(0.3, 220.0, 0.5)], 1.5, sr);
        let config = Config::default();
        let mut state = prepared_state(samples, sr, &config);
        state.cancel.cancel();

        assert!(matches!(
            pass_2::run(&mut state, &config, None),
            Err(TabError::Cancelled)
        ));
    }
}
