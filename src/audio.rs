//! Audio I/O, the PCM buffer model, and pipeline state

use crate::analysis::{
    KeyEstimate, Note, NoteSource, Onset, PitchEstimate, PlacementStats, RawNote,
    TempoEstimate, TranscriptionStatus,
};
use crate::config::Config;
use crate::error::{Result as TabResult, TabError};
use hound::WavReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decoded PCM audio. Samples are interleaved when `channels > 1` and
/// normalized to [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    pub fn mono(samples: Vec<f32>, rate: u32) -> Self {
        PcmBuffer {
            samples,
            rate,
            channels: 1,
        }
    }

    pub fn stereo(samples: Vec<f32>, rate: u32) -> Self {
        PcmBuffer {
            samples,
            rate,
            channels: 2,
        }
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_sec(&self) -> f32 {
        if self.rate == 0 {
            0.0
        } else {
            self.frames() as f32 / self.rate as f32
        }
    }

    /// Fold interleaved channels to mono by per-frame channel average
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let ch = self.channels as usize;
        self.samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }
}

/// Cooperative cancellation token threaded through the pipeline. Checked
/// between passes and inside the per-onset pitch loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Err(Cancelled) once the token has fired
    pub fn check(&self) -> TabResult<()> {
        if self.is_cancelled() {
            Err(TabError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Transcription pipeline state: mono analysis audio plus per-pass results
#[derive(Debug, Clone)]
pub struct TranscriptionState {
    /// Audio samples (mono, normalized to [-1, 1])
    pub y: Vec<f32>,
    /// Sample rate in Hz
    pub sr: u32,
    /// Cancellation token
    pub cancel: CancelToken,

    // Pass 0: Preflight & conditioning
    /// Conditioned samples (DC removed, peak normalized)
    pub y_conditioned: Option<Vec<f32>>,

    // Pass 1: Onset detection
    pub onsets: Vec<Onset>,
    /// RMS envelope behind the onsets (kept for QA plots)
    pub envelope: Vec<f32>,

    // Pass 2: Note acquisition
    pub pitch_estimates: Vec<PitchEstimate>,
    pub raw_notes: Vec<RawNote>,
    pub note_source: NoteSource,

    // Pass 3: Tempo & key estimation
    pub tempo: Option<TempoEstimate>,
    pub key: Option<KeyEstimate>,

    // Pass 5: Fret mapping + articulation tagging
    pub fretted_notes: Vec<Note>,
    pub dropped_unmappable: usize,

    // Pass 6: Deduplication
    pub notes: Vec<Note>,

    // Pass 7: Tab encoding
    pub tab_text: Option<String>,
    pub placement: Option<PlacementStats>,

    /// Outcome status ("nothing found" conditions are states, not errors)
    pub status: TranscriptionStatus,
}

impl TranscriptionState {
    /// Load an audio file, downmix, resample to the analysis rate, and
    /// create the initial state
    pub fn load<P: AsRef<Path>>(path: P, config: &Config) -> TabResult<Self> {
        let pcm = load_audio_file(path)?;
        Ok(Self::from_buffer(&pcm, config))
    }

    /// Build the state from an already-decoded buffer. Analyses run on a
    /// mono copy at `config.audio.analysis_rate`.
    pub fn from_buffer(pcm: &PcmBuffer, config: &Config) -> Self {
        let mono = pcm.to_mono();
        let y = resample_linear(&mono, pcm.rate, config.audio.analysis_rate);
        Self::from_test_samples(y, config.audio.analysis_rate)
    }

    /// Create a test state directly from synthetic mono samples
    pub fn from_test_samples(samples: Vec<f32>, sr: u32) -> Self {
        TranscriptionState {
            y: samples,
            sr,
            cancel: CancelToken::new(),
            y_conditioned: None,
            onsets: Vec::new(),
            envelope: Vec::new(),
            pitch_estimates: Vec::new(),
            raw_notes: Vec::new(),
            note_source: NoteSource::AlgorithmicDetection,
            tempo: None,
            key: None,
            fretted_notes: Vec::new(),
            dropped_unmappable: 0,
            notes: Vec::new(),
            tab_text: None,
            placement: None,
            status: TranscriptionStatus::Complete,
        }
    }

    /// Get audio duration in seconds
    pub fn duration_sec(&self) -> f32 {
        self.y.len() as f32 / self.sr as f32
    }

    /// Samples the analysis passes should read (conditioned when available)
    pub fn analysis_samples(&self) -> &[f32] {
        self.y_conditioned.as_deref().unwrap_or(&self.y)
    }
}

/// Load an audio file and return the decoded buffer
pub fn load_audio_file<P: AsRef<Path>>(path: P) -> TabResult<PcmBuffer> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" | "aiff" | "aif" => {
            let bytes = std::fs::read(path)
                .map_err(|e| TabError::DecodeError(format!("{}: {}", path.display(), e)))?;
            decode_audio_bytes(&bytes)
        }
        _ => Err(TabError::DecodeError(format!(
            "Unsupported audio format: {}",
            extension
        ))),
    }
}

/// Decode an in-memory audio payload into a PCM buffer
pub fn decode_audio_bytes(bytes: &[u8]) -> TabResult<PcmBuffer> {
    let cursor = std::io::Cursor::new(bytes);
    let mut reader = WavReader::new(cursor).map_err(|e| TabError::DecodeError(e.to_string()))?;
    let spec = reader.spec();

    if !matches!(
        spec.sample_format,
        hound::SampleFormat::Int | hound::SampleFormat::Float
    ) {
        return Err(TabError::DecodeError(
            "Unsupported sample format".to_string(),
        ));
    }

    if spec.bits_per_sample > 32 {
        return Err(TabError::DecodeError(format!(
            "Unsupported bit depth: {}",
            spec.bits_per_sample
        )));
    }

    let mut samples: Vec<f32> = Vec::with_capacity(reader.len() as usize);

    match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            for sample in reader.samples::<i32>() {
                let sample =
                    sample.map_err(|e| TabError::DecodeError(e.to_string()))? as f32 / max_value;
                samples.push(sample);
            }
        }
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                samples.push(sample.map_err(|e| TabError::DecodeError(e.to_string()))?);
            }
        }
    }

    Ok(PcmBuffer {
        samples,
        rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Validate an input file before running the pipeline
pub fn validate_audio_file<P: AsRef<Path>>(path: P, config: &Config) -> TabResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TabError::InputValidationError(format!(
            "Audio file does not exist: {}",
            path.display()
        )));
    }

    let pcm = load_audio_file(path)?;

    if pcm.samples.is_empty() {
        return Err(TabError::InputValidationError(
            "Audio file contains no samples".to_string(),
        ));
    }

    if pcm.rate < config.audio.min_sample_rate || pcm.rate > config.audio.max_sample_rate {
        return Err(TabError::UnsupportedSampleRate(pcm.rate));
    }

    let duration_sec = pcm.duration_sec();
    if duration_sec < config.audio.min_duration_sec {
        return Err(TabError::InputValidationError(format!(
            "Audio file too short: {:.2}s (minimum {:.2}s)",
            duration_sec, config.audio.min_duration_sec
        )));
    }

    if duration_sec > config.audio.max_duration_sec {
        return Err(TabError::InputValidationError(format!(
            "Audio file too long: {:.1}s (maximum {:.1}s)",
            duration_sec, config.audio.max_duration_sec
        )));
    }

    let mono = pcm.to_mono();
    let level = rms(&mono);
    if level < 1e-6 {
        eprintln!("Warning: input appears to be silent (RMS = {:.2e})", level);
    }

    let peak = peak_abs(&mono);
    if peak > 0.99 {
        eprintln!("Warning: input may be clipped (peak = {:.3})", peak);
    }

    Ok(())
}

/// Linear-interpolation resampler. Identity when the rates already match.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len.max(1));

    for i in 0..out_len {
        let src = i as f64 * ratio;
        let idx = src.floor() as usize;
        let frac = (src - idx as f64) as f32;
        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }

    out
}

/// Root-mean-square level of a sample slice
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Arithmetic mean
pub fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

/// Median (sorted copy)
pub fn median(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Largest absolute sample value
pub fn peak_abs(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_rms_of_known_signal() {
        // Full-scale square wave has RMS 1.0
        let square: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&square) - 1.0).abs() < 1e-6);

        // Sine RMS is 1/sqrt(2)
        let sine: Vec<f32> = (0..4410)
            .map(|i| (2.0 * PI * 441.0 * i as f32 / 44100.0).sin())
            .collect();
        assert!((rms(&sine) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_downmix_averages_channels() {
        let pcm = PcmBuffer::stereo(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 44100);
        let mono = pcm.to_mono();
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
        assert_eq!(pcm.frames(), 3);
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_linear(&samples, 44100, 44100), samples);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let out = resample_linear(&samples, 44100, 22050);
        let expected = samples.len() / 2;
        assert!(
            (out.len() as i64 - expected as i64).abs() <= 1,
            "resampled length {} not near {}",
            out.len(),
            expected
        );
    }

    #[test]
    fn test_resample_preserves_duration() {
        let samples = vec![0.0; 22050];
        let out = resample_linear(&samples, 22050, 44100);
        let in_dur = samples.len() as f64 / 22050.0;
        let out_dur = out.len() as f64 / 44100.0;
        assert!((in_dur - out_dur).abs() < 0.001);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let garbage = vec![0u8; 64];
        assert!(matches!(
            decode_audio_bytes(&garbage),
            Err(TabError::DecodeError(_))
        ));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        let clone = token.clone();
        clone.cancel();
        assert!(matches!(token.check(), Err(TabError::Cancelled)));
    }
}
