//! Error types for the voice sample toolkit.
//!
//! Fatal errors (decode, duration, all-silence input) abort an intake and are
//! surfaced to the caller; degradations (denoise, scoring) are absorbed by
//! their owners and only show up in logs.

use thiserror::Error;

/// Audio container decoding failures. Always fatal: retrying the same bytes
/// would reproduce the failure.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported or corrupt audio container: {0}")]
    Probe(String),
    #[error("no audio track found in container")]
    NoTrack,
    #[error("decoder error: {0}")]
    Codec(String),
    #[error("audio stream contains no samples")]
    Empty,
}

/// Internal signal-processing failures.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("audio is entirely below the silence threshold")]
    EmptyAfterTrim,
    #[error("spectral transform failed: {0}")]
    Transform(String),
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("filter construction failed: {0}")]
    Filter(String),
}

/// Noise reduction failures. Never fatal: the intake pipeline logs the cause
/// and continues with the undenoised buffer.
#[derive(Debug, Error)]
pub enum DenoiseError {
    #[error("input shorter than one analysis window ({len} < {window})")]
    TooShort { len: usize, window: usize },
    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Fatal sample-intake failures. Messages name the violated bound and the
/// actual value so the caller can produce a user-facing rejection.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("audio sample too short: {actual:.2}s (minimum {min:.1}s required)")]
    TooShort { actual: f64, min: f64 },
    #[error("audio sample too long: {actual:.2}s (maximum {max:.1}s allowed)")]
    TooLong { actual: f64, max: f64 },
    #[error("audio sample contains no audible signal after silence trimming")]
    EmptyAfterTrim,
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error("intake worker failed: {0}")]
    Worker(String),
}

/// Decode-and-resample convenience errors.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Configuration validation failures, reported once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pipeline configuration: {0}")]
    Pipeline(String),
    #[error("invalid service configuration: {0}")]
    Service(String),
}

/// Profile store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("voice profile not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("profile serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Synthesis engine failures.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis backend failed: {0}")]
    Backend(String),
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("no speakable text after cleaning")]
    EmptyText,
    #[error("speech speed {0} outside supported range [0.5, 2.0]")]
    InvalidSpeed(f32),
}

/// Failures of the profile/synthesis service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("text too long: {len} characters (maximum {max})")]
    TextTooLong { len: usize, max: usize },
}
