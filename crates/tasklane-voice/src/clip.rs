//! Audio clips for the voice assistant upload.

use std::path::Path;

use tracing::debug;

use tasklane_core::error::{Result, TasklaneError};

/// Upload name the assistant endpoint expects.
pub const UPLOAD_NAME: &str = "voice.wav";

/// Recording length cap, in seconds.
pub const MAX_CLIP_SECS: u32 = 3;

pub const SAMPLE_RATE: u32 = 16_000;

/// A WAV-encoded clip ready for upload.
#[derive(Debug, Clone)]
pub struct Clip {
    pub wav: Vec<u8>,
    pub duration_ms: u64,
}

impl Clip {
    /// Wrap mono 16-bit PCM, keeping at most [`MAX_CLIP_SECS`] of audio.
    pub fn from_pcm(pcm: &[i16], sample_rate: u32) -> Result<Self> {
        if pcm.is_empty() {
            return Err(TasklaneError::validation("No audio recorded"));
        }
        if sample_rate == 0 {
            return Err(TasklaneError::Voice("sample rate must be positive".into()));
        }
        let max_samples = u64::from(sample_rate) * u64::from(MAX_CLIP_SECS);
        let len = (pcm.len() as u64).min(max_samples);
        let pcm = &pcm[..len as usize];
        let duration_ms = (len * 1000) / u64::from(sample_rate);

        Ok(Self {
            wav: pcm_to_wav(pcm, sample_rate, 1, 16),
            duration_ms,
        })
    }

    /// Load a clip from disk. `.wav` files are sent as they are; `.pcm` and
    /// `.raw` files are read as 16 kHz mono little-endian samples.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let clip = match ext.as_deref() {
            Some("pcm" | "raw") => {
                let samples: Vec<i16> = bytes
                    .chunks_exact(2)
                    .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect();
                Self::from_pcm(&samples, SAMPLE_RATE)?
            }
            _ => Self::from_wav(bytes)?,
        };
        debug!(path = %path.display(), duration_ms = clip.duration_ms, "Loaded clip");
        Ok(clip)
    }

    fn from_wav(wav: Vec<u8>) -> Result<Self> {
        if wav.len() < 44 || &wav[0..4] != b"RIFF" || &wav[8..12] != b"WAVE" {
            return Err(TasklaneError::Voice("not a WAV file".into()));
        }
        let byte_rate = u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]);
        let duration_ms = if byte_rate == 0 {
            0
        } else {
            ((wav.len() - 44) as u64 * 1000) / byte_rate as u64
        };
        Ok(Self { wav, duration_ms })
    }
}

/// Wrap raw 16-bit PCM in a WAV container.
pub fn pcm_to_wav(pcm: &[i16], sample_rate: u32, channels: u16, bits_per_sample: u16) -> Vec<u8> {
    let data_len = pcm.len() * 2;
    let byte_rate = sample_rate.saturating_mul(channels as u32 * bits_per_sample as u32 / 8);
    let block_align = channels * bits_per_sample / 8;

    let mut wav = Vec::with_capacity(44 + data_len);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &sample in pcm {
        wav.extend_from_slice(&sample.to_le_bytes());
    }
    wav
}
