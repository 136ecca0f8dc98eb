//! Tests for Pass 7: Tab Encoding

use strum2tab::analysis::{KeyEstimate, Note, NoteSource, TempoEstimate};
use strum2tab::audio::TranscriptionState;
use strum2tab::config::Config;
use strum2tab::passes::pass_7;
use strum2tab::tab::scan_glyphs;

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start_sec: f32, string: u8, fret: u8) -> Note {
        Note {
            start_sec,
            duration_sec: 0.3,
            pitch_midi: 60,
            velocity: 0.7,
            string,
            fret,
            bend_semitones: 0,
            has_vibrato: false,
        }
    }

    /// Two-second silent state with a measured 120 BPM tempo. Tests
    /// override tempo/key/source as needed before running the pass.
    fn state_with_notes(notes: Vec<Note>) -> TranscriptionState {
        let mut state = TranscriptionState::from_test_samples(vec![0.0; 44100], 22050);
        state.notes = notes;
        state.tempo = Some(TempoEstimate {
            bpm: 120.0,
            beat_count: 8,
            from_fallback: false,
        });
        state
    }

    #[test]
    fn test_header_lines() {
        let config = Config::default();
        let mut state = state_with_notes(vec![note(0.5, 2, 5)]);
        state.key = Some(KeyEstimate::major(9));

        pass_7::run(&mut state, &config).unwrap();

        let text = state.tab_text.as_ref().unwrap();
        assert!(text.starts_with("# strum2tab transcription\n"));
        assert!(text.contains("# tempo: 120.0 BPM\n"), "got:\n{}", text);
        assert!(!text.contains("(fallback)"));
        assert!(text.contains("# key: A major\n"));
        assert!(text.contains("# source: algorithmic\n"));

        let stats = state.placement.unwrap();
        assert!(text.contains(&format!(
            "# notes: {} placed, {} dropped\n",
            stats.placed, stats.dropped
        )));
    }

    #[test]
    fn test_fallback_tempo_annotated() {
        let config = Config::default();
        let mut state = state_with_notes(Vec::new());
        state.tempo = Some(TempoEstimate {
            bpm: 120.0,
            beat_count: 2,
            from_fallback: true,
        });

        pass_7::run(&mut state, &config).unwrap();

        let text = state.tab_text.as_ref().unwrap();
        assert!(text.contains("# tempo: 120.0 BPM (fallback)\n"), "got:\n{}", text);
    }

    #[test]
    fn test_missing_tempo_assumed() {
        let config = Config::default();
        let mut state = state_with_notes(Vec::new());
        state.tempo = None;

        pass_7::run(&mut state, &config).unwrap();

        let text = state.tab_text.as_ref().unwrap();
        assert!(
            text.contains(&format!(
                "# tempo: {:.1} BPM (assumed)\n",
                config.tempo.fallback_bpm
            )),
            "got:\n{}",
            text
        );
    }

    #[test]
    fn test_key_line_omitted_when_unknown() {
        let config = Config::default();
        let mut state = state_with_notes(Vec::new());
        state.key = None;

        pass_7::run(&mut state, &config).unwrap();

        assert!(!state.tab_text.as_ref().unwrap().contains("# key:"));
    }

    #[test]
    fn test_model_source_named() {
        let config = Config::default();
        let mut state = state_with_notes(vec![note(0.25, 1, 1)]);
        state.note_source = NoteSource::ModelDetection;

        pass_7::run(&mut state, &config).unwrap();

        assert!(state.tab_text.as_ref().unwrap().contains("# source: model\n"));
    }

    #[test]
    fn test_empty_clip_renders_one_blank_measure() {
        let config = Config::default();
        let mut state = state_with_notes(Vec::new());

        pass_7::run(&mut state, &config).unwrap();

        // 2.0s at 120 BPM in 4/4 is exactly one measure
        let text = state.tab_text.as_ref().unwrap();
        assert!(text.contains("e|----------------|"), "got:\n{}", text);
        assert!(text.contains("E|----------------|"));

        let stats = state.placement.unwrap();
        assert_eq!(stats.placed, 0);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn test_rendered_glyphs_scan_back() {
        let config = Config::default();
        let mut state = state_with_notes(vec![
            note(0.1, 1, 3),
            note(0.6, 2, 0),
            note(1.2, 0, 12),
        ]);

        pass_7::run(&mut state, &config).unwrap();

        let stats = state.placement.unwrap();
        assert_eq!(stats.placed, 3);
        assert_eq!(stats.dropped, 0);

        // At 120 BPM with 4 slots per beat, 0.1s / 0.6s / 1.2s round to
        // slots 1, 5, 10
        let mut scanned = scan_glyphs(state.tab_text.as_ref().unwrap());
        scanned.sort_by_key(|(string, slot, _)| (*slot, *string));
        assert_eq!(
            scanned,
            vec![
                (1, 1, "3".to_string()),
                (2, 5, "0".to_string()),
                (0, 10, "12".to_string()),
            ]
        );
    }

    #[test]
    fn test_placement_accounts_for_every_note() {
        let config = Config::default();
        let notes: Vec<Note> = (0..8).map(|_| note(0.5, 2, 5)).collect();
        let mut state = state_with_notes(notes);

        pass_7::run(&mut state, &config).unwrap();

        // All eight share nominal slot 4; probing reaches slots 4, 6, 8
        let stats = state.placement.unwrap();
        assert_eq!(stats.placed + stats.dropped, 8);
        assert_eq!(stats.placed, 3);
        assert_eq!(stats.dropped, 5);
    }
}
