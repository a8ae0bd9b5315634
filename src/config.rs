//! Configuration for the intake pipeline and the service layer.
//!
//! All tunables live here and are validated once at startup rather than
//! being scattered through methods as literals.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::CANONICAL_SAMPLE_RATE;
use crate::error::ConfigError;

/// Spectral noise-gate tunables.
#[derive(Debug, Clone)]
pub struct NoiseGateConfig {
    /// Percentile of per-frame mean energy taken as the noise floor.
    pub floor_percentile: f32,
    /// Frames below `gate_ratio * floor` are treated as noise-dominant.
    pub gate_ratio: f32,
    /// Magnitude multiplier applied to noise-dominant frames.
    pub attenuation: f32,
}

impl Default for NoiseGateConfig {
    fn default() -> Self {
        Self {
            floor_percentile: 0.20,
            gate_ratio: 1.5,
            attenuation: 0.3,
        }
    }
}

/// Sample-intake pipeline parameters.
///
/// Defaults reproduce the canonical intake behavior; tests rely on the exact
/// values, so treat changes as behavioral changes, not cleanups.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Canonical sample rate applied once at entry.
    pub target_sample_rate: u32,
    /// Inclusive lower duration bound in seconds.
    pub min_duration_secs: f64,
    /// Inclusive upper duration bound in seconds.
    pub max_duration_secs: f64,
    /// Silence trim threshold in dB below the loudest frame.
    pub trim_threshold_db: f32,
    /// Target RMS energy after loudness normalization.
    pub target_rms: f32,
    /// Pre-emphasis coefficient.
    pub preemphasis_coeff: f32,
    /// Hard clip bounds applied as the final step.
    pub clip_low: f32,
    pub clip_high: f32,
    /// Spectral transform window/hop used by denoising and scoring.
    pub window_size: usize,
    pub hop_size: usize,
    /// Optional low-cut frequency applied before pre-emphasis.
    pub lowcut_hz: Option<f32>,
    pub noise_gate: NoiseGateConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: CANONICAL_SAMPLE_RATE,
            min_duration_secs: 3.0,
            max_duration_secs: 300.0,
            trim_threshold_db: 25.0,
            target_rms: 0.2,
            preemphasis_coeff: 0.97,
            clip_low: -0.99,
            clip_high: 0.99,
            window_size: 2048,
            hop_size: 512,
            lowcut_hz: Some(80.0),
            noise_gate: NoiseGateConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_sample_rate == 0 {
            return Err(ConfigError::Pipeline("sample rate must be non-zero".into()));
        }
        if self.min_duration_secs <= 0.0 || self.max_duration_secs <= self.min_duration_secs {
            return Err(ConfigError::Pipeline(format!(
                "duration bounds must satisfy 0 < min < max (got {} / {})",
                self.min_duration_secs, self.max_duration_secs
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.window_size {
            return Err(ConfigError::Pipeline(format!(
                "hop size {} must be in 1..={}",
                self.hop_size, self.window_size
            )));
        }
        if !self.window_size.is_power_of_two() {
            return Err(ConfigError::Pipeline(format!(
                "window size {} must be a power of two",
                self.window_size
            )));
        }
        if self.clip_low >= self.clip_high {
            return Err(ConfigError::Pipeline("clip bounds inverted".into()));
        }
        if self.target_rms <= 0.0 {
            return Err(ConfigError::Pipeline("target RMS must be positive".into()));
        }
        if let Some(hz) = self.lowcut_hz {
            let nyquist = self.target_sample_rate as f32 / 2.0;
            if hz <= 0.0 || hz >= nyquist {
                return Err(ConfigError::Pipeline(format!(
                    "low-cut frequency {} Hz outside (0, {})",
                    hz, nyquist
                )));
            }
        }
        let gate = &self.noise_gate;
        if !(0.0..=1.0).contains(&gate.floor_percentile)
            || gate.gate_ratio <= 0.0
            || !(0.0..=1.0).contains(&gate.attenuation)
        {
            return Err(ConfigError::Pipeline("invalid noise gate parameters".into()));
        }
        Ok(())
    }
}

/// A selectable stock voice for the basic TTS collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicePreset {
    pub id: String,
    pub name: String,
    pub language: String,
}

/// Service-level configuration: storage layout, languages, stock voices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub storage_root: PathBuf,
    pub supported_languages: Vec<String>,
    pub default_voices: Vec<VoicePreset>,
    pub max_text_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("storage"),
            supported_languages: vec!["vi".into(), "en".into(), "fr".into()],
            default_voices: vec![
                VoicePreset {
                    id: "stock_vi".into(),
                    name: "Vietnamese (stock)".into(),
                    language: "vi".into(),
                },
                VoicePreset {
                    id: "stock_en".into(),
                    name: "English (stock)".into(),
                    language: "en".into(),
                },
                VoicePreset {
                    id: "stock_fr".into(),
                    name: "French (stock)".into(),
                    language: "fr".into(),
                },
            ],
            max_text_length: 10_000,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supported_languages.is_empty() {
            return Err(ConfigError::Service("no supported languages".into()));
        }
        if self.max_text_length == 0 {
            return Err(ConfigError::Service("max text length must be positive".into()));
        }
        for preset in &self.default_voices {
            if !self.supported_languages.contains(&preset.language) {
                return Err(ConfigError::Service(format!(
                    "voice preset '{}' references unsupported language '{}'",
                    preset.id, preset.language
                )));
            }
        }
        Ok(())
    }

    pub fn is_language_supported(&self, language: &str) -> bool {
        self.supported_languages.iter().any(|l| l == language)
    }
}
