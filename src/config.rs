//! Configuration system for the guitar transcription and synthesis pipeline

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub audio: AudioConfig,
    pub onset: OnsetConfig,
    pub pitch: PitchConfig,
    pub notes: NotesConfig,
    pub tempo: TempoConfig,
    pub key: KeyConfig,
    pub consolidate: ConsolidateConfig,
    pub fretboard: FretboardConfig,
    pub articulation: ArticulationConfig,
    pub tab: TabConfig,
    pub synth: SynthConfig,
    pub mixer: MixerConfig,
    pub export: ExportConfig,
    pub qa: QaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            audio: AudioConfig::default(),
            onset: OnsetConfig::default(),
            pitch: PitchConfig::default(),
            notes: NotesConfig::default(),
            tempo: TempoConfig::default(),
            key: KeyConfig::default(),
            consolidate: ConsolidateConfig::default(),
            fretboard: FretboardConfig::default(),
            articulation: ArticulationConfig::default(),
            tab: TabConfig::default(),
            synth: SynthConfig::default(),
            mixer: MixerConfig::default(),
            export: ExportConfig::default(),
            qa: QaConfig::default(),
        }
    }
}

/// Audio ingest and conditioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate the transcription path analyzes at
    pub analysis_rate: u32,
    /// Sample rate the synthesis path renders at
    pub render_rate: u32,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub min_duration_sec: f32,
    pub max_duration_sec: f32,
    /// Peak level the conditioned analysis copy is normalized to
    pub conditioning_peak: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            analysis_rate: 22050,
            render_rate: 44100,
            min_sample_rate: 8000,
            max_sample_rate: 192000,
            min_duration_sec: 0.05,
            max_duration_sec: 600.0,
            conditioning_peak: 0.9,
        }
    }
}

/// Onset detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    pub window_sec: f32,
    pub hop_sec: f32,
    /// An onset fires when the current window RMS exceeds the previous
    /// window by this ratio
    pub ratio_threshold: f32,
    pub noise_floor: f32,
    /// Onsets closer than this to the previously kept onset are discarded
    pub min_gap_sec: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            window_sec: 0.1,
            hop_sec: 0.025,
            ratio_threshold: 1.3,
            noise_floor: 0.01,
            min_gap_sec: 0.04,
        }
    }
}

/// YIN pitch estimation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub window_size: usize,
    /// Analysis window starts this far after the onset to skip the pick
    /// transient
    pub analysis_offset_sec: f32,
    pub yin_threshold: f32,
    /// Windows with RMS below this are reported unvoiced without analysis
    pub silence_rms: f32,
    pub fmin_hz: f32,
    pub fmax_hz: f32,
    /// When no lag dips under yin_threshold, the global CMNDF minimum is
    /// accepted only if it sits below this value
    pub fallback_quality_max: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            analysis_offset_sec: 0.03,
            yin_threshold: 0.25,
            silence_rms: 0.01,
            fmin_hz: 80.0,
            fmax_hz: 1200.0,
            fallback_quality_max: 0.5,
        }
    }
}

/// Raw note construction configuration (algorithmic detection path)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Longest a note may ring when no following onset bounds it
    pub max_sustain_sec: f32,
    pub velocity_floor: f32,
    pub velocity_ceil: f32,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            max_sustain_sec: 1.5,
            velocity_floor: 0.3,
            velocity_ceil: 1.0,
        }
    }
}

/// Tempo estimation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub window_sec: f32,
    pub hop_sec: f32,
    /// Envelope peaks must exceed the envelope mean by this ratio
    pub peak_ratio: f32,
    pub min_peak_spacing_sec: f32,
    /// Intervals deviating from the median by more than this fraction are
    /// rejected before averaging
    pub outlier_fraction: f32,
    pub min_bpm: f32,
    pub max_bpm: f32,
    pub fallback_bpm: f32,
    /// Fewer detected beats than this triggers the fallback tempo
    pub min_beats: usize,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            window_sec: 0.05,
            hop_sec: 0.01,
            peak_ratio: 1.5,
            min_peak_spacing_sec: 0.2,
            outlier_fraction: 0.3,
            min_bpm: 60.0,
            max_bpm: 220.0,
            fallback_bpm: 120.0,
            min_beats: 4,
        }
    }
}

/// Key estimation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Chunk length for the pitch-class histogram sweep
    pub chunk_sec: f32,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self { chunk_sec: 0.25 }
    }
}

/// Raw note consolidation configuration (model detection path)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidateConfig {
    pub max_gap_sec: f32,
    pub max_pitch_delta_semitones: f32,
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            max_gap_sec: 0.07,
            max_pitch_delta_semitones: 1.5,
        }
    }
}

/// Fret mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FretboardConfig {
    pub max_fret: u8,
    /// Frets above this attract the high-fret penalty
    pub comfort_fret: u8,
    pub stretch_weight: f32,
    pub high_fret_penalty: f32,
    pub centrality_weight: f32,
    pub continuity_bonus: f32,
    pub same_string_move_cost: f32,
    pub string_hop_cost: f32,
    /// Same-string placements within this many frets of the previous note
    /// earn the continuity bonus
    pub continuity_fret_window: u8,
}

impl Default for FretboardConfig {
    fn default() -> Self {
        Self {
            max_fret: 22,
            comfort_fret: 12,
            stretch_weight: 0.25,
            high_fret_penalty: 1.5,
            centrality_weight: 0.5,
            continuity_bonus: 2.0,
            same_string_move_cost: 0.5,
            string_hop_cost: 0.3,
            continuity_fret_window: 3,
        }
    }
}

/// Deduplication and articulation tagging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticulationConfig {
    /// Same-string notes starting within this window collapse to one
    pub dedup_window_sec: f32,
    pub bend_cents_threshold: f32,
    pub vibrato_cents_threshold: f32,
}

impl Default for ArticulationConfig {
    fn default() -> Self {
        Self {
            dedup_window_sec: 0.05,
            bend_cents_threshold: 75.0,
            vibrato_cents_threshold: 35.0,
        }
    }
}

/// Tablature grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabConfig {
    pub beats_per_measure: u32,
    pub slots_per_beat: u32,
    /// How many slots past the nominal position a glyph may shift to find
    /// room before the note is dropped
    pub max_probe_slots: usize,
}

impl Default for TabConfig {
    fn default() -> Self {
        Self {
            beats_per_measure: 4,
            slots_per_beat: 4,
            max_probe_slots: 4,
        }
    }
}

/// Chord synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Base gain per sine partial before the per-note-count division
    pub partial_gain: f32,
    pub attack_sec: f32,
    pub release_sec: f32,
    /// Pattern-less block chords get a slower attack and a release that is
    /// a fraction of the chord duration
    pub block_attack_sec: f32,
    pub block_release_frac: f32,
    pub strum_stagger_sec: f32,
    pub clip_ceiling: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            partial_gain: 0.3,
            attack_sec: 0.008,
            release_sec: 0.06,
            block_attack_sec: 0.015,
            block_release_frac: 0.25,
            strum_stagger_sec: 0.012,
            clip_ceiling: 0.95,
        }
    }
}

/// Mixing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub default_gain: f32,
    pub clip_ceiling: f32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            default_gain: 1.0,
            clip_ceiling: 0.95,
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub write_midi: bool,
    pub write_analysis: bool,
    pub ticks_per_quarter: u16,
    /// General MIDI program for exported notes (25 = steel-string guitar)
    pub midi_program: u8,
    /// Assumed receiver pitch-bend range when encoding bends
    pub bend_range_semitones: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            write_midi: true,
            write_analysis: true,
            ticks_per_quarter: 480,
            midi_program: 25,
            bend_range_semitones: 2,
        }
    }
}

/// QA artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub enabled: bool,
    pub dirname: String,
    pub plot_width: u32,
    pub plot_height: u32,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dirname: "qa".to_string(),
            plot_width: 1200,
            plot_height: 600,
        }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.onset.window_sec <= 0.0 || config.onset.hop_sec <= 0.0 {
        anyhow::bail!("onset window_sec and hop_sec must be positive");
    }
    if config.onset.hop_sec > config.onset.window_sec {
        anyhow::bail!("onset hop_sec must not exceed window_sec");
    }
    if config.onset.ratio_threshold <= 1.0 {
        anyhow::bail!("onset ratio_threshold must be > 1.0");
    }

    if config.pitch.window_size < 256 || config.pitch.window_size > 16384 {
        anyhow::bail!("pitch window_size must be in [256, 16384]");
    }
    if config.pitch.fmin_hz <= 0.0 || config.pitch.fmin_hz >= config.pitch.fmax_hz {
        anyhow::bail!("pitch band requires 0 < fmin_hz < fmax_hz");
    }
    if !(0.0..1.0).contains(&config.pitch.yin_threshold) {
        anyhow::bail!("pitch yin_threshold must be in (0, 1)");
    }

    if config.tempo.min_bpm >= config.tempo.max_bpm {
        anyhow::bail!("tempo min_bpm must be < max_bpm");
    }
    if config.tempo.fallback_bpm < config.tempo.min_bpm
        || config.tempo.fallback_bpm > config.tempo.max_bpm
    {
        anyhow::bail!("tempo fallback_bpm must sit inside [min_bpm, max_bpm]");
    }

    if config.fretboard.max_fret > 24 {
        anyhow::bail!("fretboard max_fret must be <= 24");
    }
    if config.fretboard.comfort_fret > config.fretboard.max_fret {
        anyhow::bail!("fretboard comfort_fret must be <= max_fret");
    }

    if config.articulation.vibrato_cents_threshold >= config.articulation.bend_cents_threshold {
        anyhow::bail!("articulation vibrato threshold must be below bend threshold");
    }

    if config.tab.beats_per_measure == 0 || config.tab.slots_per_beat == 0 {
        anyhow::bail!("tab beats_per_measure and slots_per_beat must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.synth.clip_ceiling) || config.synth.clip_ceiling == 0.0 {
        anyhow::bail!("synth clip_ceiling must be in (0, 1]");
    }
    if !(0.0..=1.0).contains(&config.mixer.clip_ceiling) || config.mixer.clip_ceiling == 0.0 {
        anyhow::bail!("mixer clip_ceiling must be in (0, 1]");
    }

    if config.audio.min_sample_rate >= config.audio.max_sample_rate {
        anyhow::bail!("audio min_sample_rate must be < max_sample_rate");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
