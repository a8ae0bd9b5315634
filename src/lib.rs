//! Voice sample intake and cloning toolkit.
//!
//! The crate turns uploaded audio files into canonical voice samples
//! (mono f32 at 22050 Hz, trimmed, denoised, normalized) with a quality
//! score, stores them as voice profiles, and synthesizes speech in a stored
//! voice through a pluggable engine. When no cloning backend is available, a
//! fallback engine corrects plain TTS output toward the reference speaker's
//! pitch.
//!
//! Typical flow:
//!
//! ```no_run
//! use voicesmith::config::PipelineConfig;
//! use voicesmith::intake::IntakePipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("sample.mp3")?;
//! let pipeline = IntakePipeline::new(PipelineConfig::default());
//! let sample = pipeline.process(&bytes)?;
//! println!("quality {:.2}", sample.quality.composite);
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod denoise;
pub mod dsp;
pub mod error;
pub mod intake;
pub mod pitch;
pub mod profile;
pub mod quality;
pub mod synthesis;
pub mod text;

pub use audio::{AudioBuffer, CANONICAL_SAMPLE_RATE};
pub use config::{PipelineConfig, ServiceConfig};
pub use error::{IntakeError, ServiceError};
pub use intake::{CanonicalSample, IntakePipeline};
pub use profile::{ProfileStore, VoiceProfile};
pub use quality::{QualityReport, QualityScorer};
pub use synthesis::{CloningEngine, SynthesisMethod, SynthesisResult, VoiceCloner};
