//! Pass 7: Tab Encoding

use crate::audio::TranscriptionState;
use crate::config::Config;
use crate::error::Result as TabResult;
use crate::fretboard::Tuning;
use crate::tab::encode_tab;

pub fn run(state: &mut TranscriptionState, config: &Config) -> TabResult<()> {
    println!("Pass 7: Tab Encoding");

    state.cancel.check()?;

    let tuning = Tuning::standard();
    let bpm = state
        .tempo
        .as_ref()
        .map(|t| t.bpm)
        .unwrap_or(config.tempo.fallback_bpm);

    let (grid, stats) = encode_tab(&state.notes, bpm, state.duration_sec(), &tuning, &config.tab);

    let mut text = String::new();
    text.push_str("# strum2tab transcription\n");
    match &state.tempo {
        Some(tempo) if tempo.from_fallback => {
            text.push_str(&format!("# tempo: {:.1} BPM (fallback)\n", tempo.bpm));
        }
        Some(tempo) => {
            text.push_str(&format!("# tempo: {:.1} BPM\n", tempo.bpm));
        }
        None => {
            text.push_str(&format!("# tempo: {:.1} BPM (assumed)\n", bpm));
        }
    }
    if let Some(key) = &state.key {
        text.push_str(&format!("# key: {}\n", key.name));
    }
    text.push_str(&format!("# source: {}\n", state.note_source.name()));
    text.push_str(&format!(
        "# notes: {} placed, {} dropped\n",
        stats.placed, stats.dropped
    ));
    text.push('\n');
    text.push_str(&grid.render(&tuning));

    println!(
        "  ✓ {} measures rendered ({} notes placed, {} dropped)",
        grid.measures, stats.placed, stats.dropped
    );

    state.tab_text = Some(text);
    state.placement = Some(stats);

    println!("  ✓ Pass 7 complete");
    Ok(())
}
