//! Hand-rolled WAV container codec: chunk-scanning parser and canonical
//! 44-byte-header serializer, 16-bit little-endian PCM only

use crate::audio::PcmBuffer;
use crate::error::{Result as TabResult, TabError};

const HEADER_LEN: usize = 44;

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Parse WAV bytes into a PCM buffer. Chunks are scanned from offset 12;
/// unknown chunks are skipped (word aligned). Violations of the container
/// structure map to `MalformedContainer`.
pub fn parse(bytes: &[u8]) -> TabResult<PcmBuffer> {
    if bytes.len() < 12 {
        return Err(TabError::MalformedContainer(format!(
            "payload too short for a RIFF header ({} bytes)",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" {
        return Err(TabError::MalformedContainer(
            "missing RIFF magic".to_string(),
        ));
    }
    if &bytes[8..12] != b"WAVE" {
        return Err(TabError::MalformedContainer(
            "missing WAVE form type".to_string(),
        ));
    }

    let mut fmt: Option<(u16, u32, u16)> = None; // channels, rate, bits
    let mut data: Option<&[u8]> = None;

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = read_u32_le(bytes, pos + 4) as usize;
        let body_start = pos + 8;
        let body_end = body_start + size;

        if body_end > bytes.len() {
            return Err(TabError::MalformedContainer(format!(
                "truncated '{}' chunk ({} bytes declared, {} available)",
                String::from_utf8_lossy(id),
                size,
                bytes.len() - body_start
            )));
        }

        match id {
            b"fmt " => {
                if size < 16 {
                    return Err(TabError::MalformedContainer(
                        "fmt chunk shorter than 16 bytes".to_string(),
                    ));
                }
                let audio_format = read_u16_le(bytes, body_start);
                if audio_format != 1 {
                    return Err(TabError::MalformedContainer(format!(
                        "unsupported audio format {} (PCM only)",
                        audio_format
                    )));
                }
                let channels = read_u16_le(bytes, body_start + 2);
                if channels == 0 {
                    return Err(TabError::MalformedContainer(
                        "fmt chunk declares zero channels".to_string(),
                    ));
                }
                let rate = read_u32_le(bytes, body_start + 4);
                let bits = read_u16_le(bytes, body_start + 14);
                if bits != 16 {
                    return Err(TabError::MalformedContainer(format!(
                        "unsupported bit depth {} (16-bit only)",
                        bits
                    )));
                }
                fmt = Some((channels, rate, bits));
            }
            b"data" => {
                data = Some(&bytes[body_start..body_end]);
            }
            _ => {}
        }

        // Chunks are word aligned
        pos = body_end + (size & 1);
    }

    let (channels, rate, _bits) = fmt.ok_or_else(|| {
        TabError::MalformedContainer("missing fmt chunk".to_string())
    })?;
    let payload = data.ok_or_else(|| {
        TabError::MalformedContainer("missing data chunk".to_string())
    })?;

    if payload.len() % 2 != 0 {
        return Err(TabError::MalformedContainer(
            "data chunk length is not sample aligned".to_string(),
        ));
    }

    let samples: Vec<f32> = payload
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(PcmBuffer {
        samples,
        rate,
        channels,
    })
}

/// Serialize a PCM buffer to WAV bytes with the canonical 44-byte header.
/// Samples are clamped to [-1, 1] and quantized to 16-bit.
pub fn serialize(pcm: &PcmBuffer) -> Vec<u8> {
    let data_len = (pcm.samples.len() * 2) as u32;
    let byte_rate = pcm.rate * pcm.channels as u32 * 2;
    let block_align = pcm.channels * 2;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&pcm.channels.to_le_bytes());
    out.extend_from_slice(&pcm.rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in &pcm.samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let quantized = (clamped * 32767.0).round() as i16;
        out.extend_from_slice(&quantized.to_le_bytes());
    }

    out
}

/// Write a PCM buffer to a WAV file
pub fn write_file<P: AsRef<std::path::Path>>(pcm: &PcmBuffer, path: P) -> TabResult<()> {
    let bytes = serialize(pcm);
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}
