//! Pass 5: Fret Mapping
//!
//! Assigns each raw note a string/fret position, carrying the previous
//! position forward so the mapper can favor hand continuity. Bend and
//! vibrato tags are derived here from the raw pitch-deviation arrays,
//! while they are still paired with their source notes. Pitches outside
//! the instrument range are dropped silently; stray noise detections are
//! expected and must not fail a transcription.

use crate::analysis::{FretPosition, Note};
use crate::audio::TranscriptionState;
use crate::config::{ArticulationConfig, Config};
use crate::error::Result as TabResult;
use crate::fretboard::{best_position, Tuning};

/// Classify a note's pitch motion from its deviation samples (cents).
/// The min-to-max span decides: past the bend threshold the note gets an
/// integer semitone bend, past only the wobble threshold it gets vibrato,
/// never both. Arrays with fewer than two finite samples yield a plain
/// note.
fn articulation_tags(bend_cents: &[f32], config: &ArticulationConfig) -> (u8, bool) {
    let mut lo = f32::MAX;
    let mut hi = f32::MIN;
    let mut finite = 0usize;
    for &c in bend_cents {
        if c.is_finite() {
            lo = lo.min(c);
            hi = hi.max(c);
            finite += 1;
        }
    }
    if finite < 2 {
        return (0, false);
    }

    let span = hi - lo;
    if span > config.bend_cents_threshold {
        let semitones = ((span / 100.0).round() as i32).clamp(1, 12) as u8;
        (semitones, false)
    } else if span > config.vibrato_cents_threshold {
        (0, true)
    } else {
        (0, false)
    }
}

pub fn run(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    println!("Pass 5: Fret Mapping");

    state.cancel.check()?;

    let tuning = Tuning::standard();
    let mut fretted: Vec<Note> = Vec::with_capacity(state.raw_notes.len());
    let mut dropped = 0usize;
    let mut prev: Option<FretPosition> = None;

    for raw in &state.raw_notes {
        let rounded = raw.pitch_midi.round();
        if !(0.0..=127.0).contains(&rounded) {
            dropped += 1;
            continue;
        }
        let pitch_midi = rounded as u8;

        match best_position(pitch_midi, prev, &tuning, &config.fretboard) {
            Some(pos) => {
                let (bend_semitones, has_vibrato) =
                    articulation_tags(&raw.bend_cents, &config.articulation);
                fretted.push(Note {
                    start_sec: raw.start_sec,
                    duration_sec: raw.duration_sec(),
                    pitch_midi,
                    velocity: raw.velocity,
                    string: pos.string,
                    fret: pos.fret,
                    bend_semitones,
                    has_vibrato,
                });
                prev = Some(pos);
            }
            None => dropped += 1,
        }
    }

    println!(
        "  ✓ {} notes mapped to the fretboard ({} unmappable dropped)",
        fretted.len(),
        dropped
    );

    state.fretted_notes = fretted;
    state.dropped_unmappable = dropped;

    println!("  ✓ Pass 5 complete");
    Ok(())
}
