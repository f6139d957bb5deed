//! PCM16 conversion and base64 wire helpers.

use base64::Engine;

/// Sample rate of the upstream audio wire format.
pub const WIRE_SAMPLE_RATE: u32 = 24_000;

/// Converts float samples in [-1, 1] to PCM16.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Converts PCM16 samples to floats in [-1, 1).
pub fn pcm16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| f32::from(s) / 32768.0).collect()
}

/// Encodes PCM16 samples as base64 little-endian bytes for the JSON wire.
pub fn encode_pcm16(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decodes a base64 payload into PCM16 samples. Undecodable input yields an
/// empty vector; a trailing odd byte is discarded.
pub fn decode_pcm16(payload: &str) -> Vec<i16> {
    match base64::engine::general_purpose::STANDARD.decode(payload) {
        Ok(bytes) => bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
        Err(e) => {
            tracing::error!(error = %e, "failed to decode base64 audio payload");
            Vec::new()
        }
    }
}
