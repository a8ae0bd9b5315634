//! Signal primitives used across the intake pipeline and the quality scorer.
//!
//! Every operation here is pure: input buffer in, new buffer (or scalar) out,
//! no hidden state.

pub mod filter;
pub mod stft;

use crate::audio::AudioBuffer;
use crate::error::SignalError;

/// Frame size used for silence/energy analysis.
const ANALYSIS_FRAME: usize = 2048;
/// Hop size used for silence/energy analysis.
const ANALYSIS_HOP: usize = 512;

const EPSILON: f32 = 1e-10;

/// Root-mean-square energy of a slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Per-frame RMS energies (frame 2048, hop 512).
pub fn frame_rms(samples: &[f32]) -> Vec<f32> {
    let mut energies = Vec::new();
    if samples.len() < ANALYSIS_FRAME {
        if !samples.is_empty() {
            energies.push(rms(samples));
        }
        return energies;
    }

    let mut pos = 0;
    while pos + ANALYSIS_FRAME <= samples.len() {
        energies.push(rms(&samples[pos..pos + ANALYSIS_FRAME]));
        pos += ANALYSIS_HOP;
    }
    energies
}

/// Zero-crossing rate of the whole signal.
///
/// Speech typically lands around 0.03-0.1; broadband noise is higher.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mut crossings = 0usize;
    for i in 1..samples.len() {
        if (samples[i] >= 0.0) != (samples[i - 1] >= 0.0) {
            crossings += 1;
        }
    }
    crossings as f32 / (samples.len() - 1) as f32
}

/// Remove leading and trailing segments quieter than `threshold_db` below the
/// loudest analysis frame.
///
/// Never returns an empty buffer: if every frame falls below the threshold
/// (or the signal is silent), this is `SignalError::EmptyAfterTrim`.
pub fn trim_silence(audio: &AudioBuffer, threshold_db: f32) -> Result<AudioBuffer, SignalError> {
    let energies = frame_rms(&audio.samples);
    let reference = energies.iter().copied().fold(0.0f32, f32::max);

    if reference <= EPSILON {
        return Err(SignalError::EmptyAfterTrim);
    }

    let gate = reference * 10.0f32.powf(-threshold_db / 20.0);
    let first = energies.iter().position(|&e| e > gate);
    let last = energies.iter().rposition(|&e| e > gate);

    let (first, last) = match (first, last) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(SignalError::EmptyAfterTrim),
    };

    let start = first * ANALYSIS_HOP;
    let end = (last * ANALYSIS_HOP + ANALYSIS_FRAME).min(audio.samples.len());

    log::debug!(
        "trimmed {} leading and {} trailing samples at {} dB",
        start,
        audio.samples.len() - end,
        threshold_db
    );

    Ok(AudioBuffer::new(
        audio.samples[start..end].to_vec(),
        audio.sample_rate,
    ))
}

/// Scale amplitude so the signal's RMS energy equals `target_rms`.
///
/// Silent input is returned unchanged rather than dividing by zero.
pub fn rms_normalize(audio: &AudioBuffer, target_rms: f32) -> AudioBuffer {
    let current = rms(&audio.samples);
    if current <= EPSILON {
        log::warn!("audio is silent or extremely quiet, skipping RMS normalization");
        return audio.clone();
    }

    let gain = target_rms / current;
    let samples = audio.samples.iter().map(|s| s * gain).collect();
    AudioBuffer::new(samples, audio.sample_rate)
}

/// First-order high-pass pre-emphasis: `y[n] = x[n] - coeff * x[n-1]`.
pub fn preemphasis(audio: &AudioBuffer, coeff: f32) -> AudioBuffer {
    if audio.is_empty() {
        return audio.clone();
    }
    let mut samples = Vec::with_capacity(audio.len());
    samples.push(audio.samples[0]);
    for i in 1..audio.len() {
        samples.push(audio.samples[i] - coeff * audio.samples[i - 1]);
    }
    AudioBuffer::new(samples, audio.sample_rate)
}

/// Hard-limit samples to `[lo, hi]`. Last step before output; guarantees the
/// pipeline's range invariant.
pub fn clip(audio: &AudioBuffer, lo: f32, hi: f32) -> AudioBuffer {
    let samples = audio.samples.iter().map(|s| s.clamp(lo, hi)).collect();
    AudioBuffer::new(samples, audio.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, n: usize, sample_rate: u32) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_rms_of_silence() {
        assert_eq!(rms(&[0.0; 100]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_trim_removes_silent_edges() {
        let sample_rate = 22_050;
        let mut samples = vec![0.0f32; sample_rate as usize]; // 1s silence
        samples.extend(sine(440.0, sample_rate as usize, sample_rate)); // 1s tone
        samples.extend(vec![0.0f32; sample_rate as usize]); // 1s silence

        let audio = AudioBuffer::new(samples, sample_rate);
        let trimmed = trim_silence(&audio, 25.0).unwrap();

        // Roughly one second left, give or take frame granularity.
        assert!(trimmed.len() >= sample_rate as usize - 4096);
        assert!(trimmed.len() <= sample_rate as usize + 4096);
    }

    #[test]
    fn test_trim_all_silence_errors() {
        let audio = AudioBuffer::new(vec![0.0; 44_100], 22_050);
        assert!(matches!(
            trim_silence(&audio, 25.0),
            Err(SignalError::EmptyAfterTrim)
        ));
    }

    #[test]
    fn test_trim_keeps_nonsilent_input() {
        let audio = AudioBuffer::new(sine(440.0, 44_100, 22_050), 22_050);
        let trimmed = trim_silence(&audio, 25.0).unwrap();
        assert!(!trimmed.is_empty());
    }

    #[test]
    fn test_rms_normalize_reaches_target() {
        let audio = AudioBuffer::new(sine(440.0, 22_050, 22_050), 22_050);
        let normalized = rms_normalize(&audio, 0.2);
        assert!((rms(&normalized.samples) - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_rms_normalize_silence_unchanged() {
        let audio = AudioBuffer::new(vec![0.0; 1000], 22_050);
        let normalized = rms_normalize(&audio, 0.2);
        assert_eq!(normalized, audio);
    }

    #[test]
    fn test_preemphasis_flattens_dc() {
        let audio = AudioBuffer::new(vec![1.0; 100], 22_050);
        let emphasized = preemphasis(&audio, 0.97);
        assert_eq!(emphasized.samples[0], 1.0);
        for &s in &emphasized.samples[1..] {
            assert!((s - 0.03).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clip_bounds() {
        let audio = AudioBuffer::new(vec![-2.0, -0.5, 0.0, 0.5, 2.0], 22_050);
        let clipped = clip(&audio, -0.99, 0.99);
        assert_eq!(clipped.samples, vec![-0.99, -0.5, 0.0, 0.5, 0.99]);
    }

    #[test]
    fn test_zcr_of_tone_vs_silence() {
        let tone = sine(440.0, 22_050, 22_050);
        let zcr = zero_crossing_rate(&tone);
        // 440 Hz crosses zero ~880 times per second.
        assert!((zcr - 0.04).abs() < 0.01, "unexpected zcr {}", zcr);
        assert_eq!(zero_crossing_rate(&[0.0; 10]), 0.0);
    }
}
