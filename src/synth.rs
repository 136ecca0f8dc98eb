//! Additive chord synthesis: sine partials shaped by a three-phase
//! envelope, accumulated into a stereo buffer

use crate::analysis::midi_to_hz;
use crate::audio::{peak_abs, PcmBuffer};
use crate::chords::ChordSpec;
use crate::config::SynthConfig;
use crate::error::Result as TabResult;
use crate::rhythm::{PatternArchetype, RhythmPattern, ScaledEvent};

/// Attack / sustain / release gain at time `t` into a tone of `duration`
/// seconds. Short tones shrink both ramps so the sustain never goes
/// negative.
pub fn envelope_gain(t: f32, duration: f32, attack_sec: f32, release_sec: f32) -> f32 {
    if t < 0.0 || t >= duration {
        return 0.0;
    }

    let attack = attack_sec.min(duration * 0.3).max(1e-4);
    let release = release_sec.min(duration * 0.5).max(1e-4);

    if t < attack {
        t / attack
    } else if t > duration - release {
        (duration - t) / release
    } else {
        1.0
    }
}

/// Add one enveloped sine partial into an interleaved stereo buffer
fn render_tone(
    buffer: &mut [f32],
    rate: u32,
    start_sec: f32,
    duration_sec: f32,
    freq_hz: f32,
    amplitude: f32,
    attack_sec: f32,
    release_sec: f32,
) {
    if duration_sec <= 0.0 || amplitude <= 0.0 {
        return;
    }

    let frames = buffer.len() / 2;
    let start_frame = (start_sec * rate as f32).round().max(0.0) as usize;
    let tone_frames = (duration_sec * rate as f32).round() as usize;
    let end_frame = (start_frame + tone_frames).min(frames);

    let omega = 2.0 * std::f32::consts::PI * freq_hz / rate as f32;

    for frame in start_frame..end_frame {
        let n = (frame - start_frame) as f32;
        let t = n / rate as f32;
        let gain = envelope_gain(t, duration_sec, attack_sec, release_sec);
        let sample = amplitude * gain * (omega * n).sin();
        buffer[frame * 2] += sample;
        buffer[frame * 2 + 1] += sample;
    }
}

/// Which chord pitches an event sounds, low to high
pub fn selected_pitches(
    archetype: PatternArchetype,
    pitches: &[u8],
    event_index: usize,
    note_index_offset: usize,
) -> Vec<u8> {
    if pitches.is_empty() {
        return Vec::new();
    }
    match archetype {
        PatternArchetype::Block | PatternArchetype::Strumming => pitches.to_vec(),
        PatternArchetype::BassOnly => vec![pitches[0]],
        PatternArchetype::Arpeggiated => {
            vec![pitches[(event_index + note_index_offset) % pitches.len()]]
        }
    }
}

fn render_event(
    buffer: &mut [f32],
    rate: u32,
    chord_start_beats: f32,
    event: &ScaledEvent,
    event_index: usize,
    pitches: &[u8],
    archetype: PatternArchetype,
    seconds_per_beat: f32,
    config: &SynthConfig,
) {
    let sounding = selected_pitches(archetype, pitches, event_index, event.note_index_offset);
    if sounding.is_empty() {
        return;
    }

    let amplitude = config.partial_gain * event.velocity / sounding.len() as f32;
    let start_sec = (chord_start_beats + event.start_beats) * seconds_per_beat;
    let duration_sec = event.duration_beats * seconds_per_beat;

    for (k, &pitch) in sounding.iter().enumerate() {
        let stagger = if archetype == PatternArchetype::Strumming {
            k as f32 * config.strum_stagger_sec
        } else {
            0.0
        };
        render_tone(
            buffer,
            rate,
            start_sec + stagger,
            duration_sec,
            midi_to_hz(pitch as f32),
            amplitude,
            config.attack_sec,
            config.release_sec,
        );
    }
}

/// Render a chord progression to stereo PCM. With a pattern, each chord
/// plays the pattern scaled to its beat span; without one, each chord is
/// a single held block with the wide envelope. The output is normalized
/// only when the accumulated peak would clip.
pub fn synthesize_progression(
    chords: &[ChordSpec],
    pattern: Option<&RhythmPattern>,
    bpm: f32,
    rate: u32,
    config: &SynthConfig,
) -> TabResult<PcmBuffer> {
    let seconds_per_beat = 60.0 / bpm.max(1.0);
    let total_beats: f32 = chords.iter().map(|c| c.beats).sum();
    // Round up so fractional frame counts never truncate the last release
    let frames = (total_beats * seconds_per_beat * rate as f32).ceil() as usize;
    let mut buffer = vec![0.0f32; frames * 2];

    let mut cursor_beats = 0.0f32;
    for chord in chords {
        let pitches = chord.resolve()?;

        match pattern {
            Some(pattern) => {
                let events = pattern.scaled_to(chord.beats);
                for (event_index, event) in events.iter().enumerate() {
                    render_event(
                        &mut buffer,
                        rate,
                        cursor_beats,
                        event,
                        event_index,
                        &pitches,
                        pattern.archetype,
                        seconds_per_beat,
                        config,
                    );
                }
            }
            None => {
                // Held block chord across the full span
                let duration_sec = chord.beats * seconds_per_beat;
                let amplitude = config.partial_gain * 0.8 / pitches.len() as f32;
                for &pitch in &pitches {
                    render_tone(
                        &mut buffer,
                        rate,
                        cursor_beats * seconds_per_beat,
                        duration_sec,
                        midi_to_hz(pitch as f32),
                        amplitude,
                        config.block_attack_sec,
                        config.block_release_frac * duration_sec,
                    );
                }
            }
        }

        cursor_beats += chord.beats;
    }

    normalize_in_place(&mut buffer, config.clip_ceiling);
    Ok(PcmBuffer::stereo(buffer, rate))
}

/// Scale the buffer down to `ceiling` only when its peak exceeds it
pub fn normalize_in_place(samples: &mut [f32], ceiling: f32) {
    let peak = peak_abs(samples);
    if peak > ceiling && peak > 0.0 {
        let scale = ceiling / peak;
        for s in samples.iter_mut() {
            *s *= scale;
        }
    }
}
