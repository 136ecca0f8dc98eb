//! Rhythm patterns: the timing skeletons chords are rendered through

use crate::error::{Result as TabResult, TabError};
use serde::{Deserialize, Serialize};

/// How a pattern picks chord pitches at each event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternArchetype {
    /// Every chord pitch sounds together
    Block,
    /// Only the lowest pitch sounds
    BassOnly,
    /// One pitch per event, cycling through the chord
    Arpeggiated,
    /// Every pitch sounds, staggered low-to-high like a pick sweep
    Strumming,
}

/// One event inside a pattern. Start position splits into a whole beat
/// and a fractional subdivision of that beat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoteEvent {
    pub beat: u32,
    /// Fraction of a beat, in [0, 1)
    pub subdivision: f32,
    pub duration_beats: f32,
    pub velocity: f32,
    /// Rotates the arpeggio cycle for this event
    pub note_index_offset: usize,
}

impl NoteEvent {
    pub fn start_beats(&self) -> f32 {
        self.beat as f32 + self.subdivision
    }
}

/// Pattern event after scaling to a chord's beat span
#[derive(Debug, Clone, Copy)]
pub struct ScaledEvent {
    pub start_beats: f32,
    pub duration_beats: f32,
    pub velocity: f32,
    pub note_index_offset: usize,
}

/// A reusable rhythm pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmPattern {
    pub name: String,
    pub archetype: PatternArchetype,
    pub beats_per_pattern: f32,
    pub events: Vec<NoteEvent>,
}

impl RhythmPattern {
    /// Scale the pattern to a chord spanning `chord_beats`: every event
    /// start and duration multiplies by chord_beats / beats_per_pattern.
    pub fn scaled_to(&self, chord_beats: f32) -> Vec<ScaledEvent> {
        let scale = if self.beats_per_pattern > 0.0 {
            chord_beats / self.beats_per_pattern
        } else {
            1.0
        };

        self.events
            .iter()
            .map(|ev| ScaledEvent {
                start_beats: ev.start_beats() * scale,
                duration_beats: ev.duration_beats * scale,
                velocity: ev.velocity,
                note_index_offset: ev.note_index_offset,
            })
            .collect()
    }

    /// Builtin pattern library
    pub fn builtin(name: &str) -> Option<RhythmPattern> {
        let quarter = |beat: u32, velocity: f32| NoteEvent {
            beat,
            subdivision: 0.0,
            duration_beats: 1.0,
            velocity,
            note_index_offset: 0,
        };
        let eighth = |beat: u32, sub: f32, velocity: f32| NoteEvent {
            beat,
            subdivision: sub,
            duration_beats: 0.5,
            velocity,
            note_index_offset: 0,
        };

        match name {
            "block" => Some(RhythmPattern {
                name: "block".to_string(),
                archetype: PatternArchetype::Block,
                beats_per_pattern: 4.0,
                events: vec![
                    quarter(0, 0.9),
                    quarter(1, 0.7),
                    quarter(2, 0.8),
                    quarter(3, 0.7),
                ],
            }),
            "bass_strum" => Some(RhythmPattern {
                name: "bass_strum".to_string(),
                archetype: PatternArchetype::BassOnly,
                beats_per_pattern: 4.0,
                events: vec![
                    quarter(0, 0.9),
                    quarter(1, 0.6),
                    quarter(2, 0.8),
                    quarter(3, 0.6),
                ],
            }),
            "arpeggio_8ths" => Some(RhythmPattern {
                name: "arpeggio_8ths".to_string(),
                archetype: PatternArchetype::Arpeggiated,
                beats_per_pattern: 4.0,
                events: (0..8)
                    .map(|i| {
                        eighth(i / 2, 0.5 * (i % 2) as f32, if i % 2 == 0 { 0.8 } else { 0.6 })
                    })
                    .collect(),
            }),
            "folk_strum" => Some(RhythmPattern {
                name: "folk_strum".to_string(),
                archetype: PatternArchetype::Strumming,
                beats_per_pattern: 4.0,
                // Down, down, down-up, down-up
                events: vec![
                    NoteEvent {
                        beat: 0,
                        subdivision: 0.0,
                        duration_beats: 1.0,
                        velocity: 0.9,
                        note_index_offset: 0,
                    },
                    NoteEvent {
                        beat: 1,
                        subdivision: 0.0,
                        duration_beats: 1.0,
                        velocity: 0.7,
                        note_index_offset: 0,
                    },
                    eighth(2, 0.0, 0.8),
                    eighth(2, 0.5, 0.6),
                    eighth(3, 0.0, 0.8),
                    eighth(3, 0.5, 0.6),
                ],
            }),
            _ => None,
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["block", "bass_strum", "arpeggio_8ths", "folk_strum"]
    }
}

/// Load a pattern from JSON
pub fn load_pattern<P: AsRef<std::path::Path>>(path: P) -> TabResult<RhythmPattern> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        TabError::ChordParseError(format!("{}: {}", path.as_ref().display(), e))
    })?;
    let pattern: RhythmPattern = serde_json::from_str(&content)
        .map_err(|e| TabError::ChordParseError(e.to_string()))?;
    if pattern.events.is_empty() || pattern.beats_per_pattern <= 0.0 {
        return Err(TabError::ChordParseError(format!(
            "pattern '{}' needs events and a positive beat span",
            pattern.name
        )));
    }
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        for &name in RhythmPattern::builtin_names() {
            let pattern = RhythmPattern::builtin(name).expect(name);
            assert_eq!(pattern.name, name);
            assert!(!pattern.events.is_empty());
        }
        assert!(RhythmPattern::builtin("swing_16ths").is_none());
    }

    #[test]
    fn test_scaling_halves_for_short_chord() {
        let pattern = RhythmPattern::builtin("arpeggio_8ths").unwrap();
        let scaled = pattern.scaled_to(2.0);
        assert_eq!(scaled.len(), 8);
        // Pattern spans 4 beats; a 2-beat chord halves everything
        assert!((scaled[1].start_beats - 0.25).abs() < 1e-6);
        assert!((scaled[1].duration_beats - 0.25).abs() < 1e-6);
        assert!((scaled[7].start_beats - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_identity_scaling() {
        let pattern = RhythmPattern::builtin("block").unwrap();
        let scaled = pattern.scaled_to(4.0);
        assert!((scaled[3].start_beats - 3.0).abs() < 1e-6);
        assert!((scaled[3].duration_beats - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pattern_json_round_trip() {
        let pattern = RhythmPattern::builtin("folk_strum").unwrap();
        let json = serde_json::to_string(&pattern).unwrap();
        let back: RhythmPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back.events.len(), pattern.events.len());
        assert_eq!(back.archetype, PatternArchetype::Strumming);
    }
}
