//! Fretboard model: tuning, candidate positions, and ergonomic scoring

use crate::analysis::FretPosition;
use crate::config::FretboardConfig;

/// A six-string tuning. String index 0 is the highest-pitched string; the
/// open-string MIDI values run high to low to match how tab rows print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuning {
    /// Open-string MIDI notes, high to low
    pub open_midi: [u8; 6],
    /// Row labels, high to low
    pub labels: [&'static str; 6],
}

impl Tuning {
    /// Standard tuning: e4 B3 G3 D3 A2 E2
    pub fn standard() -> Self {
        Tuning {
            open_midi: [64, 59, 55, 50, 45, 40],
            labels: ["e", "B", "G", "D", "A", "E"],
        }
    }

    pub fn string_count(&self) -> usize {
        self.open_midi.len()
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning::standard()
    }
}

/// All playable positions for a MIDI pitch: one per string where
/// 0 <= fret <= max_fret
pub fn candidate_positions(
    pitch_midi: u8,
    tuning: &Tuning,
    config: &FretboardConfig,
) -> Vec<FretPosition> {
    let mut candidates = Vec::new();
    for (string, &base) in tuning.open_midi.iter().enumerate() {
        if pitch_midi < base {
            continue;
        }
        let fret = pitch_midi - base;
        if fret <= config.max_fret {
            candidates.push(FretPosition {
                string: string as u8,
                fret,
            });
        }
    }
    candidates
}

/// Ergonomic cost of a candidate position given the previous placement.
/// Lower is better.
fn position_score(
    pos: FretPosition,
    prev: Option<FretPosition>,
    config: &FretboardConfig,
) -> f32 {
    let fret = pos.fret as f32;
    let mut score = fret * config.stretch_weight;

    let over_comfort = pos.fret.saturating_sub(config.comfort_fret) as f32;
    score += over_comfort * config.high_fret_penalty;

    // Middle strings are cheapest to reach
    score += (pos.string as f32 - 2.5).abs() * config.centrality_weight;

    if let Some(prev) = prev {
        let fret_delta = (pos.fret as i16 - prev.fret as i16).unsigned_abs() as f32;
        if pos.string == prev.string {
            if fret_delta <= config.continuity_fret_window as f32 {
                score -= config.continuity_bonus;
            }
            score += fret_delta * config.same_string_move_cost;
        } else {
            let string_delta = (pos.string as i16 - prev.string as i16).unsigned_abs() as f32;
            score += string_delta * config.string_hop_cost;
        }
    }

    score
}

/// Pick the best position for a pitch, or None when the pitch has no
/// playable position. Candidates are scanned in fixed string order and
/// compared with strict `<`, so the mapping is deterministic and ties keep
/// the higher string.
pub fn best_position(
    pitch_midi: u8,
    prev: Option<FretPosition>,
    tuning: &Tuning,
    config: &FretboardConfig,
) -> Option<FretPosition> {
    let candidates = candidate_positions(pitch_midi, tuning, config);

    let mut best: Option<(FretPosition, f32)> = None;
    for pos in candidates {
        let score = position_score(pos, prev, config);
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((pos, score)),
        }
    }

    best.map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FretboardConfig {
        FretboardConfig::default()
    }

    #[test]
    fn test_open_string_candidates() {
        let tuning = Tuning::standard();
        // E2 = 40 is playable only as the open low-E string
        let cands = candidate_positions(40, &tuning, &config());
        assert_eq!(cands, vec![FretPosition { string: 5, fret: 0 }]);
    }

    #[test]
    fn test_a3_has_multiple_candidates() {
        let tuning = Tuning::standard();
        // A3 = 57: G string fret 2, D string fret 7, A string fret 12, E string fret 17
        let cands = candidate_positions(57, &tuning, &config());
        assert_eq!(cands.len(), 4);
        assert!(cands.contains(&FretPosition { string: 2, fret: 2 }));
        assert!(cands.contains(&FretPosition { string: 5, fret: 17 }));
    }

    #[test]
    fn test_below_range_unmappable() {
        let tuning = Tuning::standard();
        // Below E2
        assert!(candidate_positions(38, &tuning, &config()).is_empty());
    }

    #[test]
    fn test_low_fret_preferred_over_high() {
        let tuning = Tuning::standard();
        let pos = best_position(57, None, &tuning, &config()).unwrap();
        // Fret 2 on the G string beats fret 12+ options
        assert_eq!(pos, FretPosition { string: 2, fret: 2 });
    }

    #[test]
    fn test_continuity_pulls_to_same_string() {
        let tuning = Tuning::standard();
        let config = config();
        let first = best_position(57, None, &tuning, &config).unwrap();
        // B3 = 59, two semitones up; same-string fret 4 should win over
        // open B string because of the continuity bonus
        let second = best_position(59, Some(first), &tuning, &config).unwrap();
        assert_eq!(second.string, first.string);
        assert_eq!(second.fret, 4);
    }

    #[test]
    fn test_determinism() {
        let tuning = Tuning::standard();
        let config = config();
        let pitches: [u8; 6] = [52, 55, 57, 59, 60, 64];

        let run = || {
            let mut prev = None;
            let mut placed = Vec::new();
            for &p in &pitches {
                let pos = best_position(p, prev, &tuning, &config).unwrap();
                placed.push(pos);
                prev = Some(pos);
            }
            placed
        };

        assert_eq!(run(), run());
    }
}
