//! Spectral-gating noise reduction.
//!
//! Estimates a noise floor from the quietest analysis frames, then attenuates
//! the magnitudes of frames whose energy stays near that floor. Phase is kept
//! from the original signal, so speech frames pass through untouched.

use crate::audio::AudioBuffer;
use crate::config::NoiseGateConfig;
use crate::dsp::stft::Stft;
use crate::error::DenoiseError;

/// Spectral noise gate over a fixed analysis transform.
#[derive(Clone)]
pub struct Denoiser {
    stft: Stft,
    config: NoiseGateConfig,
}

impl Denoiser {
    pub fn new(stft: Stft, config: NoiseGateConfig) -> Self {
        Self { stft, config }
    }

    /// Reduce stationary background noise.
    ///
    /// The output may be up to one hop shorter than the input because the
    /// trailing partial frame is dropped by the analysis transform. Callers
    /// treat any error here as a degradation, not a failure.
    pub fn denoise(&self, audio: &AudioBuffer) -> Result<AudioBuffer, DenoiseError> {
        if audio.len() < self.stft.window_size() {
            return Err(DenoiseError::TooShort {
                len: audio.len(),
                window: self.stft.window_size(),
            });
        }

        let mut spec = self.stft.forward(&audio.samples)?;

        // Mean magnitude energy per frame.
        let energies: Vec<f32> = spec
            .magnitudes
            .iter()
            .map(|mags| mags.iter().map(|m| m * m).sum::<f32>() / mags.len() as f32)
            .collect();

        let floor = percentile(&energies, self.config.floor_percentile);
        let gate = floor * self.config.gate_ratio;

        let mut gated = 0usize;
        for (frame, &energy) in spec.magnitudes.iter_mut().zip(energies.iter()) {
            if energy < gate {
                for mag in frame.iter_mut() {
                    *mag *= self.config.attenuation;
                }
                gated += 1;
            }
        }

        log::debug!(
            "noise gate attenuated {}/{} frames (floor {:.2e})",
            gated,
            energies.len(),
            floor
        );

        let samples = self.stft.inverse(&spec)?;
        Ok(AudioBuffer::new(samples, audio.sample_rate))
    }
}

/// Value at the given fraction of the sorted slice.
fn percentile(values: &[f32], fraction: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((sorted.len() as f32 * fraction) as usize).min(sorted.len() - 1);
    sorted[idx]
}
