//! Pass 3: Tempo & Key Estimation
//!
//! Independent best-effort path over the same audio. Neither estimate can
//! fail the pipeline; thin evidence degrades to the fallback tempo or an
//! undetermined key.

use crate::analysis::{hz_to_midi, midi_pitch_class, KeyEstimate, TempoEstimate};
use crate::audio::{mean, median, rms, TranscriptionState};
use crate::config::Config;
use crate::dsp::{pick_peaks, rms_envelope, yin_pitch};
use crate::error::Result as TabResult;

/// Beat-interval tempo estimate from a fine-grained energy envelope
fn estimate_tempo(samples: &[f32], sr: u32, config: &Config) -> TempoEstimate {
    let window = ((config.tempo.window_sec * sr as f32).round() as usize).max(1);
    let hop = ((config.tempo.hop_sec * sr as f32).round() as usize).max(1);
    let envelope = rms_envelope(samples, window, hop);

    let threshold = mean(&envelope) * config.tempo.peak_ratio;
    let min_spacing = ((config.tempo.min_peak_spacing_sec / config.tempo.hop_sec).round() as usize).max(1);
    let peaks = pick_peaks(&envelope, threshold, min_spacing);

    let fallback = TempoEstimate {
        bpm: config.tempo.fallback_bpm,
        beat_count: peaks.len(),
        from_fallback: true,
    };

    if peaks.len() < config.tempo.min_beats {
        return fallback;
    }

    let intervals: Vec<f32> = peaks
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f32 * config.tempo.hop_sec)
        .collect();

    // Reject intervals far from the median before averaging, so a missed
    // or doubled beat does not skew the tempo
    let med = median(&intervals);
    let filtered: Vec<f32> = intervals
        .iter()
        .copied()
        .filter(|&iv| (iv - med).abs() <= config.tempo.outlier_fraction * med)
        .collect();

    if filtered.is_empty() {
        return fallback;
    }

    let bpm = (60.0 / mean(&filtered)).clamp(config.tempo.min_bpm, config.tempo.max_bpm);
    TempoEstimate {
        bpm,
        beat_count: peaks.len(),
        from_fallback: false,
    }
}

/// Sweep the signal in uniform chunks, estimate a pitch per chunk, and
/// bucket the results into a 12-bin pitch-class histogram.
fn estimate_key(state: &TranscriptionState, config: &Config) -> TabResult<Option<KeyEstimate>> {
    let samples = state.analysis_samples();
    let sr = state.sr;
    let chunk = ((config.key.chunk_sec * sr as f32).round() as usize).max(1);
    let window_size = config.pitch.window_size;

    let mut histogram = [0u32; 12];
    let mut pos = 0usize;
    while pos + window_size <= samples.len() {
        state.cancel.check()?;

        let window = &samples[pos..pos + window_size];
        pos += chunk;

        if rms(window) < config.pitch.silence_rms {
            continue;
        }

        if let Some((frequency_hz, _)) = yin_pitch(
            window,
            sr,
            config.pitch.fmin_hz,
            config.pitch.fmax_hz,
            config.pitch.yin_threshold,
            config.pitch.fallback_quality_max,
        ) {
            let pc = midi_pitch_class(hz_to_midi(frequency_hz));
            histogram[pc as usize] += 1;
        }
    }

    let total: u32 = histogram.iter().sum();
    if total == 0 {
        return Ok(None);
    }

    let mut best_pc = 0usize;
    for (pc, &count) in histogram.iter().enumerate() {
        if count > histogram[best_pc] {
            best_pc = pc;
        }
    }

    Ok(Some(KeyEstimate::major(best_pc as u8)))
}

pub fn run(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    println!("Pass 3: Tempo & Key Estimation");

    state.cancel.check()?;

    let tempo = estimate_tempo(state.analysis_samples(), state.sr, config);
    if tempo.from_fallback {
        println!(
            "  ✓ Tempo: {:.1} BPM (fallback, only {} beats found)",
            tempo.bpm, tempo.beat_count
        );
    } else {
        println!(
            "  ✓ Tempo: {:.1} BPM (from {} beats)",
            tempo.bpm, tempo.beat_count
        );
    }
    state.tempo = Some(tempo);

    let key = estimate_key(state, config)?;
    match &key {
        Some(key) => println!("  ✓ Key: {}", key.name),
        None => println!("  Key: undetermined (no voiced chunks)"),
    }
    state.key = key;

    println!("  ✓ Pass 3 complete");
    Ok(())
}
