//! MIDI export of the transcription

use crate::analysis::Note;
use crate::audio::TranscriptionState;
use crate::config::Config;
use crate::error::{Result as TabResult, TabError};
use midly::num::{u14, u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, TrackEvent, TrackEventKind};
use std::fs::File;
use std::io::Write;

const BEND_CENTER: u16 = 8192;
/// Bend ramp resolution per note
const BEND_STEPS: u32 = 8;

/// Export the transcribed notes as a single-track MIDI file
pub fn export_midi(
    state: &TranscriptionState,
    output_dir: &std::path::Path,
    config: &Config,
) -> TabResult<()> {
    if state.notes.is_empty() {
        eprintln!("Warning: No notes to export");
        return Ok(());
    }

    std::fs::create_dir_all(output_dir)?;

    let midi_path = output_dir.join("transcription.mid");
    let midi_data = convert_notes_to_midi(&state.notes, state.tempo.as_ref().map(|t| t.bpm), config)?;

    let mut file = File::create(&midi_path)?;
    file.write_all(&midi_data)?;

    println!(
        "Exported {} notes to {}",
        state.notes.len(),
        midi_path.display()
    );
    Ok(())
}

/// Absolute-tick event used while assembling the track. `order` breaks
/// same-tick ties so offs and bend resets land before the next note-on.
struct AbsEvent {
    tick: u32,
    order: u8,
    kind: TrackEventKind<'static>,
}

/// Convert notes to MIDI file bytes. Notes carry explicit durations and
/// may overlap, so events are laid out on an absolute tick line first and
/// delta-encoded at the end.
fn convert_notes_to_midi(
    notes: &[Note],
    tempo_bpm: Option<f32>,
    config: &Config,
) -> TabResult<Vec<u8>> {
    let ppq = config.export.ticks_per_quarter;
    let bpm = tempo_bpm.unwrap_or(config.tempo.fallback_bpm);
    let ticks_per_sec = ppq as f32 * bpm / 60.0;
    let tempo_uspq = (60_000_000.0 / bpm) as u32;

    let mut events: Vec<AbsEvent> = Vec::new();

    events.push(AbsEvent {
        tick: 0,
        order: 0,
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo_uspq))),
    });
    events.push(AbsEvent {
        tick: 0,
        order: 0,
        kind: TrackEventKind::Midi {
            channel: u4::from(0),
            message: MidiMessage::ProgramChange {
                program: u7::from(config.export.midi_program.min(127)),
            },
        },
    });

    for note in notes {
        let start_tick = (note.start_sec * ticks_per_sec).round() as u32;
        let duration_ticks = ((note.duration_sec * ticks_per_sec).round() as u32).max(1);
        let end_tick = start_tick + duration_ticks;
        let velocity = (note.velocity.clamp(0.0, 1.0) * 127.0).round() as u8;

        events.push(AbsEvent {
            tick: start_tick,
            order: 2,
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOn {
                    key: u7::from(note.pitch_midi.min(127)),
                    vel: u7::from(velocity),
                },
            },
        });
        events.push(AbsEvent {
            tick: end_tick,
            order: 0,
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOff {
                    key: u7::from(note.pitch_midi.min(127)),
                    vel: u7::from(0),
                },
            },
        });

        if note.bend_semitones > 0 {
            // Ramp the wheel from center up to the bend target across the
            // note, then recenter at note-off
            for step in 0..=BEND_STEPS {
                let frac = step as f32 / BEND_STEPS as f32;
                let tick = start_tick + (duration_ticks as f32 * frac) as u32;
                let raw = bend_raw(
                    note.bend_semitones as f32 * frac,
                    config.export.bend_range_semitones,
                );
                events.push(AbsEvent {
                    tick: tick.min(end_tick.saturating_sub(1)),
                    order: 3,
                    kind: bend_event(raw),
                });
            }
            events.push(AbsEvent {
                tick: end_tick,
                order: 1,
                kind: bend_event(BEND_CENTER),
            });
        }
    }

    events.sort_by_key(|ev| (ev.tick, ev.order));

    let mut track_events = Vec::with_capacity(events.len() + 1);
    let mut current_tick = 0u32;
    for ev in events {
        let delta = ev.tick - current_tick;
        current_tick = ev.tick;
        track_events.push(TrackEvent {
            delta: u28::from(delta),
            kind: ev.kind,
        });
    }

    track_events.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let header = Header {
        format: Format::SingleTrack,
        timing: midly::Timing::Metrical(u15::from(ppq)),
    };

    let smf = Smf {
        header,
        tracks: vec![track_events],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| TabError::ExportError(format!("failed to write MIDI data: {:?}", e)))?;
    Ok(bytes)
}

fn bend_event(raw: u16) -> TrackEventKind<'static> {
    TrackEventKind::Midi {
        channel: u4::from(0),
        message: MidiMessage::PitchBend {
            bend: PitchBend(u14::from(raw.min(16383))),
        },
    }
}

/// Raw 14-bit wheel value for a bend of `semitones` with the receiver's
/// assumed `range`
fn bend_raw(semitones: f32, range: u8) -> u16 {
    let range = range.max(1) as f32;
    let offset = (semitones / range).clamp(-1.0, 1.0) * 8191.0;
    (BEND_CENTER as f32 + offset).round().clamp(0.0, 16383.0) as u16
}
