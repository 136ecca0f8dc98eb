//! Chord naming grammar and progression input

use crate::error::{Result as TabResult, TabError};
use serde::{Deserialize, Serialize};

/// One chord in a progression. Either a symbolic `name` ("Am", "G7") or an
/// explicit MIDI pitch set; explicit pitches win when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pitches: Option<Vec<u8>>,
    #[serde(default = "default_beats")]
    pub beats: f32,
}

fn default_beats() -> f32 {
    4.0
}

impl ChordSpec {
    pub fn named(name: &str, beats: f32) -> Self {
        ChordSpec {
            name: Some(name.to_string()),
            pitches: None,
            beats,
        }
    }

    /// Resolve to MIDI pitches, low to high
    pub fn resolve(&self) -> TabResult<Vec<u8>> {
        if let Some(pitches) = &self.pitches {
            if pitches.is_empty() {
                return Err(TabError::ChordParseError(
                    "explicit pitch set is empty".to_string(),
                ));
            }
            if let Some(&bad) = pitches.iter().find(|&&p| p > 127) {
                return Err(TabError::ChordParseError(format!(
                    "pitch {} outside MIDI range",
                    bad
                )));
            }
            let mut sorted = pitches.clone();
            sorted.sort_unstable();
            return Ok(sorted);
        }

        match &self.name {
            Some(name) => resolve_chord_name(name),
            None => Err(TabError::ChordParseError(
                "chord has neither name nor pitches".to_string(),
            )),
        }
    }
}

/// A chord progression file: chords plus optional tempo and pattern hints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    #[serde(default)]
    pub bpm: Option<f32>,
    #[serde(default)]
    pub pattern: Option<String>,
    pub chords: Vec<ChordSpec>,
}

/// Load a progression from JSON
pub fn load_progression<P: AsRef<std::path::Path>>(path: P) -> TabResult<Progression> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        TabError::ChordParseError(format!("{}: {}", path.as_ref().display(), e))
    })?;
    let progression: Progression = serde_json::from_str(&content)
        .map_err(|e| TabError::ChordParseError(e.to_string()))?;
    if progression.chords.is_empty() {
        return Err(TabError::ChordParseError(
            "progression contains no chords".to_string(),
        ));
    }
    Ok(progression)
}

/// Parse a chord name into MIDI pitches voiced in the C3 octave
/// (C3 = 48 ... B3 = 59). Root letter is case-insensitive; an unknown
/// quality suffix falls back to a major triad with a warning.
pub fn resolve_chord_name(name: &str) -> TabResult<Vec<u8>> {
    let chars: Vec<char> = name.chars().collect();
    if chars.is_empty() {
        return Err(TabError::ChordParseError("empty chord name".to_string()));
    }

    let base_midi: i16 = match chars[0].to_ascii_uppercase() {
        'C' => 48,
        'D' => 50,
        'E' => 52,
        'F' => 53,
        'G' => 55,
        'A' => 57,
        'B' => 59,
        other => {
            return Err(TabError::ChordParseError(format!(
                "unknown root note '{}' in chord '{}'",
                other, name
            )))
        }
    };

    let mut idx = 1;
    let accidental: i16 = if idx < chars.len() && (chars[idx] == '#' || chars[idx] == 'b') {
        idx += 1;
        if chars[idx - 1] == '#' {
            1
        } else {
            -1
        }
    } else {
        0
    };

    let root = (base_midi + accidental) as u8;
    let quality: String = chars[idx..].iter().collect();

    let intervals: &[u8] = match quality.as_str() {
        "" | "maj" | "M" => &[0, 4, 7],
        "m" | "min" | "-" => &[0, 3, 7],
        "7" => &[0, 4, 7, 10],
        "maj7" | "M7" => &[0, 4, 7, 11],
        "m7" | "min7" | "-7" => &[0, 3, 7, 10],
        "dim" => &[0, 3, 6],
        "aug" => &[0, 4, 8],
        "sus2" => &[0, 2, 7],
        "sus4" => &[0, 5, 7],
        "5" => &[0, 7],
        unknown => {
            eprintln!(
                "Warning: unknown chord quality '{}' in '{}', using major triad",
                unknown, name
            );
            &[0, 4, 7]
        }
    };

    Ok(intervals.iter().map(|&iv| root + iv).collect())
}
