//! Audio buffer type and container I/O.
//!
//! All processing operates on mono `f32` samples at a fixed rate. Uploads are
//! decoded and resampled to the canonical rate exactly once at intake entry.

pub mod decode;
pub mod io;
pub mod resample;

use crate::error::AudioError;

/// Canonical sample rate for voice samples and synthesized audio.
pub const CANONICAL_SAMPLE_RATE: u32 = 22_050;

/// An ordered sequence of mono samples at a fixed sample rate.
///
/// Values are expected in [-1, 1] after the intake pipeline; they may exceed
/// that range transiently during processing.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }
}

/// Decode an audio container and resample to `target_rate`.
///
/// Accepts any container symphonia can probe (WAV, MP3, FLAC, M4A, OGG).
pub fn load_and_resample(bytes: &[u8], target_rate: u32) -> Result<AudioBuffer, AudioError> {
    let decoded = decode::decode_bytes(bytes)?;
    let resampled = resample::resample(&decoded, target_rate)?;
    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 22_050], 22_050);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak() {
        let buffer = AudioBuffer::new(vec![0.1, -0.7, 0.3], 22_050);
        assert!((buffer.peak() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_zero_rate_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 100], 0);
        assert_eq!(buffer.duration_secs(), 0.0);
    }
}
