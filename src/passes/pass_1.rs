//! Pass 1: Onset Detection

use crate::analysis::{Onset, TranscriptionStatus};
use crate::audio::TranscriptionState;
use crate::config::Config;
use crate::dsp::rms_envelope;
use crate::error::Result as TabResult;

/// Scan an RMS envelope for attack frames. A frame is an onset when its
/// energy exceeds the previous frame's by `ratio_threshold` and clears the
/// absolute noise floor; the first frame is compared against silence. The
/// debounce gap suppresses re-triggers on the decay of the same pluck.
///
/// Consecutive frames share all but a hop-length trailing segment, so new
/// energy that fired the comparison must sit in that segment; onset times
/// point there rather than at the window start.
fn detect_onsets(envelope: &[f32], window_sec: f32, hop_sec: f32, config: &Config) -> Vec<Onset> {
    let mut onsets = Vec::new();
    let mut last_time = f32::NEG_INFINITY;

    for i in 0..envelope.len() {
        let prev = if i == 0 { 0.0 } else { envelope[i - 1] };
        let cur = envelope[i];

        if cur <= config.onset.noise_floor {
            continue;
        }
        if cur <= prev * config.onset.ratio_threshold {
            continue;
        }

        let time_sec = if i == 0 {
            0.0
        } else {
            i as f32 * hop_sec + (window_sec - hop_sec)
        };
        if time_sec - last_time < config.onset.min_gap_sec {
            continue;
        }

        onsets.push(Onset {
            time_sec,
            strength: cur,
        });
        last_time = time_sec;
    }

    onsets
}

pub fn run(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    println!("Pass 1: Onset Detection");

    state.cancel.check()?;

    let samples = state.analysis_samples();
    let window = ((config.onset.window_sec * state.sr as f32).round() as usize).max(1);
    let hop = ((config.onset.hop_sec * state.sr as f32).round() as usize).max(1);

    let envelope = rms_envelope(samples, window, hop);
    println!(
        "  ✓ RMS envelope computed ({} frames, {:.0} ms window)",
        envelope.len(),
        config.onset.window_sec * 1000.0
    );

    let onsets = detect_onsets(
        &envelope,
        config.onset.window_sec,
        config.onset.hop_sec,
        config,
    );

    if onsets.is_empty() {
        eprintln!("  Warning: no onsets detected");
        state.status = TranscriptionStatus::NoOnsetsFound;
    } else {
        println!(
            "  ✓ {} onsets detected (first at {:.3}s)",
            onsets.len(),
            onsets[0].time_sec
        );
    }

    state.envelope = envelope;
    state.onsets = onsets;

    println!("  ✓ Pass 1 complete");
    Ok(())
}
