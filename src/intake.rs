//! Voice sample intake pipeline.
//!
//! One pass from uploaded bytes to a canonical, scored sample:
//! decode -> duration check -> resample -> trim -> denoise -> normalize ->
//! filter -> clip -> score. Decode and duration failures abort the intake;
//! denoise and scoring degradations are logged and absorbed.

use crate::audio::{self, AudioBuffer};
use crate::config::PipelineConfig;
use crate::denoise::Denoiser;
use crate::dsp;
use crate::dsp::filter::LowCutFilter;
use crate::dsp::stft::Stft;
use crate::error::{IntakeError, SignalError};
use crate::quality::{QualityReport, QualityScorer};

/// A fully processed voice sample ready for storage.
#[derive(Debug, Clone)]
pub struct CanonicalSample {
    /// Mono samples at the pipeline's canonical rate, clipped to range.
    pub buffer: AudioBuffer,
    /// Duration of the decoded upload in seconds, measured before trimming.
    pub duration: f64,
    pub quality: QualityReport,
}

/// Sample intake pipeline. Cheap to clone; clones share no state, so one
/// instance per worker is fine.
#[derive(Clone)]
pub struct IntakePipeline {
    config: PipelineConfig,
    denoiser: Denoiser,
    scorer: QualityScorer,
}

impl IntakePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let stft = Stft::new(config.window_size, config.hop_size);
        let denoiser = Denoiser::new(stft.clone(), config.noise_gate.clone());
        let scorer = QualityScorer::new(stft);
        Self {
            config,
            denoiser,
            scorer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full intake on an uploaded audio file.
    ///
    /// Deterministic: identical bytes and configuration always produce the
    /// same sample and the same report.
    pub fn process(&self, bytes: &[u8]) -> Result<CanonicalSample, IntakeError> {
        let decoded = audio::decode::decode_bytes(bytes)?;

        // Duration is checked against the native-rate buffer, before the
        // resampler can shave or pad edge samples.
        let duration = decoded.duration_secs();
        if duration < self.config.min_duration_secs {
            return Err(IntakeError::TooShort {
                actual: duration,
                min: self.config.min_duration_secs,
            });
        }
        if duration > self.config.max_duration_secs {
            return Err(IntakeError::TooLong {
                actual: duration,
                max: self.config.max_duration_secs,
            });
        }

        log::debug!(
            "intake: {:.2}s at {} Hz, {} samples",
            duration,
            decoded.sample_rate,
            decoded.len()
        );

        let resampled = audio::resample::resample(&decoded, self.config.target_sample_rate)?;

        let trimmed = dsp::trim_silence(&resampled, self.config.trim_threshold_db).map_err(
            |e| match e {
                SignalError::EmptyAfterTrim => IntakeError::EmptyAfterTrim,
                other => IntakeError::Signal(other),
            },
        )?;

        let denoised = match self.denoiser.denoise(&trimmed) {
            Ok(clean) => clean,
            Err(e) => {
                log::warn!("denoising skipped: {}", e);
                trimmed
            }
        };

        let normalized = dsp::rms_normalize(&denoised, self.config.target_rms);
        let filtered = self.filter(normalized)?;
        let clipped = dsp::clip(&filtered, self.config.clip_low, self.config.clip_high);

        let quality = self.scorer.score(&clipped);

        log::info!(
            "intake accepted: {:.2}s, quality {:.2}{}",
            duration,
            quality.composite,
            if quality.degraded.is_some() {
                " (degraded)"
            } else {
                ""
            }
        );

        Ok(CanonicalSample {
            buffer: clipped,
            duration,
            quality,
        })
    }

    /// Low-cut (when configured) followed by pre-emphasis.
    fn filter(&self, audio: AudioBuffer) -> Result<AudioBuffer, IntakeError> {
        let mut audio = audio;
        if let Some(cutoff) = self.config.lowcut_hz {
            let mut filter = LowCutFilter::new(audio.sample_rate as f32, cutoff)
                .map_err(IntakeError::Signal)?;
            filter.process(&mut audio.samples);
        }
        Ok(dsp::preemphasis(&audio, self.config.preemphasis_coeff))
    }

    /// `process` on the blocking thread pool, for async callers.
    pub async fn process_async(&self, bytes: Vec<u8>) -> Result<CanonicalSample, IntakeError> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.process(&bytes))
            .await
            .map_err(|e| IntakeError::Worker(e.to_string()))?
    }
}
