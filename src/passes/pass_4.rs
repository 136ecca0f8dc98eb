//! Pass 4: Raw Note Consolidation
//!
//! Model detectors emit bursts of near-duplicate notes during a single
//! bent or wobbled pitch. Adjacent raw notes are merged when both the time
//! gap and the pitch gap are small. Runs before fret mapping so the merged
//! bend arrays still describe continuous pitch motion; the internal path
//! never produces such bursts and is left untouched.

use crate::analysis::{NoteSource, RawNote};
use crate::audio::TranscriptionState;
use crate::config::Config;
use crate::error::Result as TabResult;

struct PendingNote {
    start_sec: f32,
    end_sec: f32,
    pitch_sum: f32,
    pitch_count: usize,
    velocity: f32,
    bend_cents: Vec<f32>,
}

impl PendingNote {
    fn begin(note: &RawNote) -> Self {
        PendingNote {
            start_sec: note.start_sec,
            end_sec: note.end_sec,
            pitch_sum: note.pitch_midi,
            pitch_count: 1,
            velocity: note.velocity,
            bend_cents: note.bend_cents.clone(),
        }
    }

    fn mean_pitch(&self) -> f32 {
        self.pitch_sum / self.pitch_count as f32
    }

    fn absorb(&mut self, note: &RawNote) {
        self.end_sec = self.end_sec.max(note.end_sec);
        self.pitch_sum += note.pitch_midi;
        self.pitch_count += 1;
        self.velocity = self.velocity.max(note.velocity);
        self.bend_cents.extend_from_slice(&note.bend_cents);
    }

    fn finish(self) -> RawNote {
        RawNote {
            start_sec: self.start_sec,
            end_sec: self.end_sec,
            pitch_midi: self.mean_pitch(),
            velocity: self.velocity,
            bend_cents: self.bend_cents,
        }
    }
}

/// Merge wobble bursts in a time-sorted raw note list
fn consolidate(notes: &[RawNote], config: &Config) -> Vec<RawNote> {
    let mut merged = Vec::with_capacity(notes.len());
    let mut pending: Option<PendingNote> = None;

    for note in notes {
        let absorbed = match pending.as_mut() {
            Some(acc) => {
                let gap_sec = note.start_sec - acc.end_sec;
                let pitch_delta = (note.pitch_midi - acc.mean_pitch()).abs();
                if gap_sec < config.consolidate.max_gap_sec
                    && pitch_delta < config.consolidate.max_pitch_delta_semitones
                {
                    acc.absorb(note);
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if !absorbed {
            if let Some(done) = pending.replace(PendingNote::begin(note)) {
                merged.push(done.finish());
            }
        }
    }

    if let Some(acc) = pending {
        merged.push(acc.finish());
    }

    merged
}

pub fn run(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    println!("Pass 4: Raw Note Consolidation");

    state.cancel.check()?;

    if state.note_source != NoteSource::ModelDetection {
        println!("  Internal detection path, no consolidation needed");
        println!("  ✓ Pass 4 complete");
        return Ok(());
    }

    let before = state.raw_notes.len();
    state.raw_notes = consolidate(&state.raw_notes, config);
    println!(
        "  ✓ {} raw notes consolidated into {}",
        before,
        state.raw_notes.len()
    );

    println!("  ✓ Pass 4 complete");
    Ok(())
}
