//! QA artifacts generation

use crate::analysis::hz_to_midi;
use crate::audio::TranscriptionState;
use crate::config::Config;
use crate::error::{Result as TabResult, TabError};
use plotters::prelude::*;
use std::fs;

/// Generate QA artifacts (plots) for a finished transcription
pub fn generate_artifacts(
    state: &TranscriptionState,
    output_dir: &std::path::Path,
    config: &Config,
) -> TabResult<()> {
    let qa_dir = output_dir.join(&config.qa.dirname);
    fs::create_dir_all(&qa_dir)?;

    println!("Generating QA artifacts...");

    generate_envelope_plot(state, &qa_dir, config)?;
    generate_pitch_track_plot(state, &qa_dir, config)?;

    println!("QA artifacts generated in {}", qa_dir.display());
    Ok(())
}

/// RMS envelope line with detected onsets marked on top
fn generate_envelope_plot(
    state: &TranscriptionState,
    qa_dir: &std::path::Path,
    config: &Config,
) -> TabResult<()> {
    if state.envelope.is_empty() {
        // Nothing to plot before onset detection has run
        return Ok(());
    }

    let path = qa_dir.join("envelope.png");
    let root = BitMapBackend::new(&path, (config.qa.plot_width, config.qa.plot_height))
        .into_drawing_area();
    root.fill(&WHITE).map_err(|e| {
        TabError::QaGenerationError(format!("Failed to fill plot background: {:?}", e))
    })?;

    let hop_sec = config.onset.hop_sec as f64;
    let duration_sec = state.duration_sec() as f64;
    let max_rms = state
        .envelope
        .iter()
        .cloned()
        .fold(0.0f32, f32::max)
        .max(1e-6) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption("RMS Envelope and Onsets", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..duration_sec, 0.0f64..max_rms * 1.1)
        .map_err(|e| TabError::QaGenerationError(format!("Failed to build chart: {:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc("RMS")
        .draw()
        .map_err(|e| TabError::QaGenerationError(format!("Failed to draw mesh: {:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            state
                .envelope
                .iter()
                .enumerate()
                .map(|(i, &v)| (i as f64 * hop_sec, v as f64)),
            &BLUE,
        ))
        .map_err(|e| TabError::QaGenerationError(format!("Failed to draw series: {:?}", e)))?;

    chart
        .draw_series(state.onsets.iter().map(|onset| {
            Circle::new(
                (onset.time_sec as f64, onset.strength as f64),
                4,
                RED.filled(),
            )
        }))
        .map_err(|e| TabError::QaGenerationError(format!("Failed to draw series: {:?}", e)))?;

    Ok(())
}

/// Per-onset pitch estimates as a MIDI-scale scatter. Unvoiced estimates
/// are skipped, leaving visible gaps in the track.
fn generate_pitch_track_plot(
    state: &TranscriptionState,
    qa_dir: &std::path::Path,
    config: &Config,
) -> TabResult<()> {
    let voiced: Vec<(f64, f64, f32)> = state
        .pitch_estimates
        .iter()
        .filter(|p| p.is_voiced())
        .map(|p| {
            (
                p.time_sec as f64,
                hz_to_midi(p.frequency_hz) as f64,
                p.confidence,
            )
        })
        .collect();

    if voiced.is_empty() {
        return Ok(());
    }

    let path = qa_dir.join("pitch_track.png");
    let root = BitMapBackend::new(&path, (config.qa.plot_width, config.qa.plot_height))
        .into_drawing_area();
    root.fill(&WHITE).map_err(|e| {
        TabError::QaGenerationError(format!("Failed to fill plot background: {:?}", e))
    })?;

    let duration_sec = state.duration_sec() as f64;
    let min_midi = voiced.iter().map(|v| v.1).fold(f64::MAX, f64::min) - 2.0;
    let max_midi = voiced.iter().map(|v| v.1).fold(f64::MIN, f64::max) + 2.0;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pitch Track", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..duration_sec, min_midi..max_midi)
        .map_err(|e| TabError::QaGenerationError(format!("Failed to build chart: {:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Time (seconds)")
        .y_desc("Pitch (MIDI)")
        .draw()
        .map_err(|e| TabError::QaGenerationError(format!("Failed to draw mesh: {:?}", e)))?;

    chart
        .draw_series(voiced.iter().map(|&(t, midi, confidence)| {
            let color = if confidence >= 0.5 {
                BLUE.filled()
            } else {
                RGBColor(150, 150, 150).filled()
            };
            Circle::new((t, midi), 3, color)
        }))
        .map_err(|e| TabError::QaGenerationError(format!("Failed to draw series: {:?}", e)))?;

    Ok(())
}
