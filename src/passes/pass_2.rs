//! Pass 2: Note Acquisition
//!
//! Converts onsets into raw (unfretted) notes. When an external
//! [`NoteDetector`] is supplied its output is used wholesale; on detector
//! failure or absence the internal per-onset YIN path runs instead.

use crate::analysis::{hz_to_midi, NoteSource, PitchEstimate, RawNote, TranscriptionStatus};
use crate::audio::{rms, PcmBuffer, TranscriptionState};
use crate::config::Config;
use crate::dsp::yin_pitch;
use crate::error::Result as TabResult;
use crate::model::NoteDetector;

fn unvoiced(time_sec: f32) -> PitchEstimate {
    PitchEstimate {
        time_sec,
        frequency_hz: PitchEstimate::UNVOICED,
        confidence: 0.0,
    }
}

/// Model output is untrusted: drop non-finite or inverted notes, clamp
/// velocities, and restore time order.
fn sanitize_model_notes(mut notes: Vec<RawNote>) -> Vec<RawNote> {
    notes.retain(|n| {
        n.start_sec.is_finite()
            && n.end_sec.is_finite()
            && n.pitch_midi.is_finite()
            && n.end_sec > n.start_sec
    });
    for note in notes.iter_mut() {
        note.velocity = if note.velocity.is_finite() {
            note.velocity.clamp(0.0, 1.0)
        } else {
            0.5
        };
    }
    notes.sort_by(|a, b| {
        a.start_sec
            .partial_cmp(&b.start_sec)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    notes
}

/// Internal path: YIN over a fixed window starting `analysis_offset_sec`
/// after each onset, skipping the attack transient.
fn detect_notes_algorithmic(
    state: &TranscriptionState,
    config: &Config,
) -> TabResult<(Vec<PitchEstimate>, Vec<RawNote>)> {
    let samples = state.analysis_samples();
    let sr = state.sr;
    let duration_sec = state.duration_sec();
    let offset = (config.pitch.analysis_offset_sec * sr as f32).round() as usize;
    let window_size = config.pitch.window_size;

    let mut estimates = Vec::with_capacity(state.onsets.len());
    for onset in &state.onsets {
        state.cancel.check()?;

        let start = (onset.time_sec * sr as f32).round() as usize + offset;
        if start >= samples.len() {
            estimates.push(unvoiced(onset.time_sec));
            continue;
        }

        let end = (start + window_size).min(samples.len());
        let window = &samples[start..end];

        // Fast exit on near-silent windows before the lag search
        if window.len() < window_size / 2 || rms(window) < config.pitch.silence_rms {
            estimates.push(unvoiced(onset.time_sec));
            continue;
        }

        let est = match yin_pitch(
            window,
            sr,
            config.pitch.fmin_hz,
            config.pitch.fmax_hz,
            config.pitch.yin_threshold,
            config.pitch.fallback_quality_max,
        ) {
            Some((frequency_hz, confidence)) => PitchEstimate {
                time_sec: onset.time_sec,
                frequency_hz,
                confidence,
            },
            None => unvoiced(onset.time_sec),
        };
        estimates.push(est);
    }

    // Raw notes from the voiced estimates. A note sustains until the next
    // onset, capped by the sustain limit and the end of the signal.
    let max_strength = state
        .onsets
        .iter()
        .map(|o| o.strength)
        .fold(0.0f32, f32::max);

    let mut raw_notes = Vec::new();
    for (i, est) in estimates.iter().enumerate() {
        if !est.is_voiced() {
            continue;
        }

        let start_sec = state.onsets[i].time_sec;
        let next_sec = state
            .onsets
            .get(i + 1)
            .map(|o| o.time_sec)
            .unwrap_or(duration_sec);
        let end_sec = next_sec
            .min(start_sec + config.notes.max_sustain_sec)
            .min(duration_sec);

        let strength_norm = if max_strength > 0.0 {
            state.onsets[i].strength / max_strength
        } else {
            0.0
        };
        let velocity = config.notes.velocity_floor
            + (config.notes.velocity_ceil - config.notes.velocity_floor) * strength_norm;

        raw_notes.push(RawNote {
            start_sec,
            end_sec,
            pitch_midi: hz_to_midi(est.frequency_hz),
            velocity: velocity.clamp(config.notes.velocity_floor, config.notes.velocity_ceil),
            bend_cents: Vec::new(),
        });
    }

    Ok((estimates, raw_notes))
}

fn run_algorithmic(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    if state.onsets.is_empty() {
        println!("  No onsets to analyze, skipping pitch estimation");
        return Ok(());
    }

    let (estimates, raw_notes) = detect_notes_algorithmic(state, config)?;
    let voiced = estimates.iter().filter(|e| e.is_voiced()).count();
    println!(
        "  ✓ {} of {} onsets yielded a pitch",
        voiced,
        estimates.len()
    );

    state.pitch_estimates = estimates;
    state.raw_notes = raw_notes;
    state.note_source = NoteSource::AlgorithmicDetection;
    Ok(())
}

pub fn run(
    state: &mut TranscriptionState,
    config: &Config,
    detector: Option<&dyn NoteDetector>,
) -> TabResult<()> {
    println!("Pass 2: Note Acquisition");

    state.cancel.check()?;

    match detector {
        Some(detector) => {
            println!("  Querying note detector '{}'...", detector.name());
            let pcm = PcmBuffer::mono(state.analysis_samples().to_vec(), state.sr);
            match detector.detect(&pcm) {
                Ok(raw) => {
                    let raw = sanitize_model_notes(raw);
                    // An empty detection on onset-less audio leaves the
                    // scan's labeling in place
                    if raw.is_empty() && state.status == TranscriptionStatus::NoOnsetsFound {
                        println!("  Detector returned no notes for onset-less audio");
                    } else {
                        println!("  ✓ Detector returned {} raw notes", raw.len());
                        state.raw_notes = raw;
                        state.note_source = NoteSource::ModelDetection;
                    }
                }
                Err(e) => {
                    eprintln!(
                        "  Warning: note detector failed ({}), falling back to onset analysis",
                        e
                    );
                    run_algorithmic(state, config)?;
                }
            }
        }
        None => run_algorithmic(state, config)?,
    }

    if state.raw_notes.is_empty() {
        if state.status == TranscriptionStatus::Complete {
            eprintln!("  Warning: no pitched notes found");
            state.status = TranscriptionStatus::NoPitchedNotes;
        }
    } else {
        println!(
            "  ✓ {} raw notes acquired ({} path)",
            state.raw_notes.len(),
            state.note_source.name()
        );
        // A successful model detection supersedes an empty onset scan
        if state.note_source == NoteSource::ModelDetection {
            state.status = TranscriptionStatus::Complete;
        }
    }

    println!("  ✓ Pass 2 complete");
    Ok(())
}
