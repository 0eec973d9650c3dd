/// Sample rate for linear16 PCM streaming. Must match the backend's
/// `/listen` configuration.
pub const LIVE_SAMPLE_RATE: u32 = 48_000;

/// Audio sample data (16-bit PCM, mono after downmix)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Convert one float sample in [-1.0, 1.0] to linear16.
pub fn f32_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 0x8000 as f32) as i16
    } else {
        (s * 0x7fff as f32) as i16
    }
}

/// Downmix interleaved i16 input to mono by averaging channels.
pub fn downmix_to_mono_i16(data: &[i16], channels: usize) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => data.to_vec(),
        n => data
            .chunks_exact(n)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / n as i32) as i16
            })
            .collect(),
    }
}

/// Downmix interleaved f32 input to mono linear16.
pub fn downmix_to_mono_f32(data: &[f32], channels: usize) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => data.iter().copied().map(f32_to_i16).collect(),
        n => data
            .chunks_exact(n)
            .map(|chunk| {
                let sum: f32 = chunk.iter().sum();
                f32_to_i16(sum / n as f32)
            })
            .collect(),
    }
}

/// Encode a frame as raw little-endian PCM bytes for transport.
pub fn encode_frame(frame: &AudioFrame) -> Vec<u8> {
    frame
        .samples
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect()
}
