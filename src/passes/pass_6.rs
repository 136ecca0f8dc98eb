//! Pass 6: Note Deduplication

use crate::analysis::Note;
use crate::audio::TranscriptionState;
use crate::config::Config;
use crate::error::Result as TabResult;

/// Collapse same-string collisions: when two notes land on one string
/// within the dedup window, only the louder survives. Input must be
/// sorted by start time.
fn dedup_notes(notes: &[Note], window_sec: f32) -> Vec<Note> {
    let mut kept: Vec<Note> = Vec::with_capacity(notes.len());
    let mut last_on_string: [Option<usize>; 6] = [None; 6];

    for note in notes {
        let string = note.string as usize;

        if let Some(idx) = last_on_string.get(string).copied().flatten() {
            if note.start_sec - kept[idx].start_sec < window_sec {
                if note.velocity > kept[idx].velocity {
                    kept[idx] = note.clone();
                }
                continue;
            }
        }

        if string < last_on_string.len() {
            last_on_string[string] = Some(kept.len());
        }
        kept.push(note.clone());
    }

    kept
}

pub fn run(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    println!("Pass 6: Note Deduplication");

    state.cancel.check()?;

    let mut sorted = state.fretted_notes.clone();
    sorted.sort_by(|a, b| {
        a.start_sec
            .partial_cmp(&b.start_sec)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let before = sorted.len();
    let mut notes = dedup_notes(&sorted, config.articulation.dedup_window_sec);
    notes.sort_by(|a, b| {
        a.start_sec
            .partial_cmp(&b.start_sec)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.string.cmp(&b.string))
    });

    println!(
        "  ✓ {} collisions removed, {} notes final",
        before - notes.len(),
        notes.len()
    );

    state.notes = notes;

    println!("  ✓ Pass 6 complete");
    Ok(())
}
