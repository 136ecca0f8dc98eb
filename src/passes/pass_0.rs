//! Pass 0: Preflight & Conditioning

use crate::audio::{mean, peak_abs, rms, TranscriptionState};
use crate::config::Config;
use crate::error::{Result as TabResult, TabError};

pub fn run(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    println!("Pass 0: Preflight & Conditioning");

    state.cancel.check()?;

    if state.y.is_empty() {
        return Err(TabError::InputValidationError(
            "Audio buffer contains no samples".to_string(),
        ));
    }

    let duration_sec = state.duration_sec();
    if duration_sec < config.audio.min_duration_sec {
        return Err(TabError::InputValidationError(format!(
            "Audio too short: {:.2}s (minimum {:.2}s)",
            duration_sec, config.audio.min_duration_sec
        )));
    }
    if duration_sec > config.audio.max_duration_sec {
        return Err(TabError::InputValidationError(format!(
            "Audio too long: {:.1}s (maximum {:.1}s)",
            duration_sec, config.audio.max_duration_sec
        )));
    }
    println!(
        "  ✓ Input validated ({:.2}s at {} Hz)",
        duration_sec, state.sr
    );

    // DC removal
    let dc = mean(&state.y);
    let mut conditioned: Vec<f32> = state.y.iter().map(|&x| x - dc).collect();
    println!("  ✓ DC offset removed (mean {:.2e})", dc);

    // Peak conditioning. Silent input is left alone so noise is not
    // amplified to full scale.
    let peak = peak_abs(&conditioned);
    let level = rms(&conditioned);
    if level < 1e-6 {
        eprintln!("  Warning: input is effectively silent (RMS = {:.2e})", level);
    } else if peak > 0.0 {
        let gain = config.audio.conditioning_peak / peak;
        for sample in conditioned.iter_mut() {
            *sample *= gain;
        }
        println!(
            "  ✓ Peak conditioned to {:.2} (gain {:.2})",
            config.audio.conditioning_peak, gain
        );
    }

    state.y_conditioned = Some(conditioned);

    println!("  ✓ Pass 0 complete");
    Ok(())
}
