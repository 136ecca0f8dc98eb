//! Mixing: sequential concatenation and gain-weighted overlay

use crate::audio::PcmBuffer;
use crate::config::MixerConfig;
use crate::error::{Result as TabResult, TabError};
use crate::synth::normalize_in_place;

/// Duplicate a mono buffer into interleaved stereo; stereo passes through
pub fn upmix_stereo(pcm: &PcmBuffer) -> TabResult<PcmBuffer> {
    match pcm.channels {
        1 => {
            let mut samples = Vec::with_capacity(pcm.samples.len() * 2);
            for &s in &pcm.samples {
                samples.push(s);
                samples.push(s);
            }
            Ok(PcmBuffer::stereo(samples, pcm.rate))
        }
        2 => Ok(pcm.clone()),
        n => Err(TabError::InputValidationError(format!(
            "cannot upmix {}-channel buffer",
            n
        ))),
    }
}

fn check_sources(sources: &[PcmBuffer]) -> TabResult<u32> {
    let first = sources.first().ok_or_else(|| {
        TabError::InputValidationError("mixer needs at least one source".to_string())
    })?;
    for pcm in sources {
        if pcm.rate != first.rate {
            return Err(TabError::InputValidationError(format!(
                "mixer sources must share a sample rate ({} vs {})",
                pcm.rate, first.rate
            )));
        }
    }
    Ok(first.rate)
}

/// Concatenate sources back to back. Chord stems sized to exact beat
/// spans line up on the tempo grid this way.
pub fn mix_sequential(sources: &[PcmBuffer], config: &MixerConfig) -> TabResult<PcmBuffer> {
    let rate = check_sources(sources)?;

    let total_frames: usize = sources.iter().map(|s| s.frames()).sum();
    let mut out = vec![0.0f32; total_frames * 2];

    let mut cursor = 0usize;
    for pcm in sources {
        let stereo = upmix_stereo(pcm)?;
        let start = cursor * 2;
        out[start..start + stereo.samples.len()].copy_from_slice(&stereo.samples);
        cursor += stereo.frames();
    }

    normalize_in_place(&mut out, config.clip_ceiling);
    Ok(PcmBuffer::stereo(out, rate))
}

/// Sum sources at time zero with per-source gain. Missing gains default
/// to `config.default_gain`. Output length follows the longest source.
pub fn mix_overlay(
    sources: &[PcmBuffer],
    gains: &[f32],
    config: &MixerConfig,
) -> TabResult<PcmBuffer> {
    let rate = check_sources(sources)?;

    let max_frames = sources.iter().map(|s| s.frames()).max().unwrap_or(0);
    let mut out = vec![0.0f32; max_frames * 2];

    for (idx, pcm) in sources.iter().enumerate() {
        let gain = gains.get(idx).copied().unwrap_or(config.default_gain);
        let stereo = upmix_stereo(pcm)?;
        for (i, &s) in stereo.samples.iter().enumerate() {
            out[i] += gain * s;
        }
    }

    normalize_in_place(&mut out, config.clip_ceiling);
    Ok(PcmBuffer::stereo(out, rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MixerConfig {
        MixerConfig::default()
    }

    #[test]
    fn test_upmix_duplicates_channels() {
        let mono = PcmBuffer::mono(vec![0.1, -0.2, 0.3], 44100);
        let stereo = upmix_stereo(&mono).unwrap();
        assert_eq!(stereo.samples, vec![0.1, 0.1, -0.2, -0.2, 0.3, 0.3]);
        assert_eq!(stereo.frames(), 3);
    }

    #[test]
    fn test_sequential_concatenates() {
        let a = PcmBuffer::mono(vec![0.1; 100], 44100);
        let b = PcmBuffer::stereo(vec![0.2; 300], 44100);
        let mixed = mix_sequential(&[a, b], &config()).unwrap();
        assert_eq!(mixed.frames(), 100 + 150);
        assert!((mixed.samples[0] - 0.1).abs() < 1e-6);
        assert!((mixed.samples[200] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_overlay_commutative() {
        let a = PcmBuffer::mono(vec![0.1, 0.2, 0.3], 44100);
        let b = PcmBuffer::mono(vec![0.05, -0.1, 0.2, 0.4], 44100);

        let ab = mix_overlay(&[a.clone(), b.clone()], &[], &config()).unwrap();
        let ba = mix_overlay(&[b, a], &[], &config()).unwrap();
        assert_eq!(ab.samples, ba.samples);
        assert_eq!(ab.frames(), 4);
    }

    #[test]
    fn test_overlay_applies_gains() {
        let a = PcmBuffer::mono(vec![0.4], 44100);
        let b = PcmBuffer::mono(vec![0.4], 44100);
        let mixed = mix_overlay(&[a, b], &[0.5, 0.25], &config()).unwrap();
        assert!((mixed.samples[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_rate_mismatch_rejected() {
        let a = PcmBuffer::mono(vec![0.1], 44100);
        let b = PcmBuffer::mono(vec![0.1], 22050);
        assert!(mix_sequential(&[a, b], &config()).is_err());
    }

    #[test]
    fn test_no_sources_rejected() {
        assert!(mix_sequential(&[], &config()).is_err());
    }

    #[test]
    fn test_overlay_normalizes_on_clip() {
        let a = PcmBuffer::mono(vec![0.8], 44100);
        let b = PcmBuffer::mono(vec![0.8], 44100);
        let mixed = mix_overlay(&[a, b], &[], &config()).unwrap();
        assert!((mixed.samples[0] - 0.95).abs() < 1e-6);
    }
}
