//! Tablature grid encoding and ASCII rendering

use crate::analysis::{Note, PlacementStats};
use crate::config::TabConfig;
use crate::fretboard::Tuning;
use ndarray::Array2;

/// Fixed-width tab grid: one row per string (row 0 = high e), one ASCII
/// cell per slot. Multi-character glyphs occupy consecutive cells.
#[derive(Debug, Clone)]
pub struct TabGrid {
    cells: Array2<char>,
    pub measures: usize,
    pub beats_per_measure: u32,
    pub slots_per_beat: u32,
}

impl TabGrid {
    pub fn new(measures: usize, beats_per_measure: u32, slots_per_beat: u32) -> Self {
        let total_slots = measures * (beats_per_measure * slots_per_beat) as usize;
        TabGrid {
            cells: Array2::from_elem((6, total_slots), '-'),
            measures,
            beats_per_measure,
            slots_per_beat,
        }
    }

    pub fn slots_per_measure(&self) -> usize {
        (self.beats_per_measure * self.slots_per_beat) as usize
    }

    pub fn total_slots(&self) -> usize {
        self.cells.ncols()
    }

    fn is_empty_run(&self, string: usize, start: usize, len: usize) -> bool {
        if start + len > self.total_slots() {
            return false;
        }
        (start..start + len).all(|c| self.cells[[string, c]] == '-')
    }

    /// Try to place a glyph at its nominal slot, probing forward up to
    /// `max_probe` slots. A start is viable when the glyph's run of cells
    /// is empty, the cell before the run is empty (row start counts), and
    /// the glyph stays inside one measure. Returns the chosen slot.
    pub fn try_place(
        &mut self,
        string: usize,
        nominal_slot: usize,
        glyph: &str,
        max_probe: usize,
    ) -> Option<usize> {
        let len = glyph.chars().count();
        if len == 0 || string >= 6 {
            return None;
        }
        let spm = self.slots_per_measure();

        for slot in nominal_slot..=nominal_slot + max_probe {
            if slot + len > self.total_slots() {
                break;
            }
            // Glyphs may not straddle a measure boundary; rendering slices
            // per measure
            if slot / spm != (slot + len - 1) / spm {
                continue;
            }
            if !self.is_empty_run(string, slot, len) {
                continue;
            }
            if slot > 0 && self.cells[[string, slot - 1]] != '-' {
                continue;
            }

            for (k, ch) in glyph.chars().enumerate() {
                self.cells[[string, slot + k]] = ch;
            }
            return Some(slot);
        }

        None
    }

    /// Render the grid as measure blocks of six `label|cells|` rows,
    /// high string first, blank line between measures.
    pub fn render(&self, tuning: &Tuning) -> String {
        let spm = self.slots_per_measure();
        let mut out = String::new();

        for m in 0..self.measures {
            let start = m * spm;
            let end = start + spm;
            for string in 0..6 {
                let row: String = (start..end).map(|c| self.cells[[string, c]]).collect();
                out.push_str(tuning.labels[string]);
                out.push('|');
                out.push_str(&row);
                out.push_str("|\n");
            }
            if m + 1 < self.measures {
                out.push('\n');
            }
        }

        out
    }
}

/// Glyph text for a note: fret digits, `b<target>` for bends, `~` for
/// vibrato
pub fn glyph_for(note: &Note) -> String {
    let mut glyph = note.fret.to_string();
    if note.bend_semitones > 0 {
        let target = note.fret as u16 + note.bend_semitones as u16;
        glyph.push('b');
        glyph.push_str(&target.to_string());
    } else if note.has_vibrato {
        glyph.push('~');
    }
    glyph
}

/// Encode notes onto a grid sized from the audio duration and tempo.
/// Every input note is either placed or counted as dropped.
pub fn encode_tab(
    notes: &[Note],
    bpm: f32,
    duration_sec: f32,
    tuning: &Tuning,
    config: &TabConfig,
) -> (TabGrid, PlacementStats) {
    let seconds_per_beat = 60.0 / bpm.max(1.0);
    let seconds_per_measure = seconds_per_beat * config.beats_per_measure as f32;
    let measures = ((duration_sec / seconds_per_measure).ceil() as usize).max(1);

    let mut grid = TabGrid::new(measures, config.beats_per_measure, config.slots_per_beat);
    let mut stats = PlacementStats::default();

    for note in notes {
        let start_beats = note.start_sec / seconds_per_beat;
        let nominal = (start_beats * config.slots_per_beat as f32).round() as usize;
        let nominal = nominal.min(grid.total_slots().saturating_sub(1));

        let glyph = glyph_for(note);
        match grid.try_place(note.string as usize, nominal, &glyph, config.max_probe_slots) {
            Some(_) => stats.placed += 1,
            None => stats.dropped += 1,
        }
    }

    (grid, stats)
}

/// Recover (string, slot, glyph) triples from rendered tab text. Placed
/// glyphs are always separated by at least one `-`, so runs of non-dash
/// characters are exactly the glyphs.
pub fn scan_glyphs(text: &str) -> Vec<(usize, usize, String)> {
    // Reassemble the six full rows across measure blocks
    let mut rows: [String; 6] = Default::default();
    let mut string_idx = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(bar) = line.find('|') else { continue };
        let Some(inner) = line.get(bar + 1..line.len().saturating_sub(1)) else {
            continue;
        };
        rows[string_idx % 6].push_str(inner);
        string_idx += 1;
    }

    let mut found = Vec::new();
    for (string, row) in rows.iter().enumerate() {
        let chars: Vec<char> = row.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '-' {
                i += 1;
                continue;
            }
            let start = i;
            let mut glyph = String::new();
            while i < chars.len() && chars[i] != '-' {
                glyph.push(chars[i]);
                i += 1;
            }
            found.push((string, start, glyph));
        }
    }

    found
}
