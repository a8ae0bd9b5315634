//! Voice sample quality scoring.
//!
//! Five spectral/temporal features are combined into a composite score in
//! [0, 1]. The score ranks samples for profile creation; it is a heuristic,
//! not a perceptual model. Scoring never fails: degenerate input falls back
//! to a neutral composite with a typed reason.

use crate::audio::AudioBuffer;
use crate::dsp;
use crate::dsp::stft::{Spectrogram, Stft};

/// Weight of each feature in the composite.
const W_CLARITY: f32 = 0.25;
const W_DYNAMIC: f32 = 0.15;
const W_ROLLOFF: f32 = 0.20;
const W_ARTICULATION: f32 = 0.15;
const W_HARMONICITY: f32 = 0.25;

/// Speech intelligibility band (telephone band).
const SPEECH_BAND_LOW_HZ: f32 = 300.0;
const SPEECH_BAND_HIGH_HZ: f32 = 3400.0;

/// Spectral rolloff energy fraction and normalization frequency.
const ROLLOFF_FRACTION: f32 = 0.85;
const ROLLOFF_NORM_HZ: f32 = 4000.0;

/// Median filter length for harmonic/percussive separation.
const HPSS_KERNEL: usize = 17;

/// Composite used when the input cannot be scored.
const DEGRADED_COMPOSITE: f64 = 0.6;

/// Why a sample could not be scored from its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDegraded {
    /// No samples at all.
    EmptyInput,
    /// Samples present but no measurable energy.
    SilentInput,
    /// Spectral analysis failed or produced zero energy.
    SpectralFailure,
}

/// Per-feature scores and their weighted composite.
///
/// Sub-scores are each clipped to [0, 1]; the composite is additionally
/// rounded to two decimals. `degraded` is set when the composite is the
/// neutral fallback rather than a measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub clarity: f32,
    pub dynamic_range: f32,
    pub rolloff: f32,
    pub articulation: f32,
    pub harmonicity: f32,
    pub composite: f64,
    pub degraded: Option<ScoreDegraded>,
}

impl QualityReport {
    fn degraded(reason: ScoreDegraded) -> Self {
        Self {
            clarity: 0.0,
            dynamic_range: 0.0,
            rolloff: 0.0,
            articulation: 0.0,
            harmonicity: 0.0,
            composite: DEGRADED_COMPOSITE,
            degraded: Some(reason),
        }
    }
}

/// Deterministic quality scorer over a fixed analysis transform.
#[derive(Clone)]
pub struct QualityScorer {
    stft: Stft,
}

impl QualityScorer {
    pub fn new(stft: Stft) -> Self {
        Self { stft }
    }

    /// Score a sample. Identical input always yields an identical report.
    pub fn score(&self, audio: &AudioBuffer) -> QualityReport {
        if audio.is_empty() {
            log::warn!("scoring empty buffer, using neutral composite");
            return QualityReport::degraded(ScoreDegraded::EmptyInput);
        }
        if dsp::rms(&audio.samples) < 1e-6 {
            log::warn!("scoring silent buffer, using neutral composite");
            return QualityReport::degraded(ScoreDegraded::SilentInput);
        }

        let spec = match self.stft.forward(&audio.samples) {
            Ok(spec) if spec.frames() > 0 => spec,
            Ok(_) => {
                log::warn!("spectral analysis produced no frames, using neutral composite");
                return QualityReport::degraded(ScoreDegraded::SpectralFailure);
            }
            Err(e) => {
                log::warn!("spectral analysis failed ({}), using neutral composite", e);
                return QualityReport::degraded(ScoreDegraded::SpectralFailure);
            }
        };

        let total_energy: f32 = spec
            .magnitudes
            .iter()
            .flat_map(|f| f.iter())
            .map(|m| m * m)
            .sum();
        if total_energy <= 0.0 {
            log::warn!("zero spectral energy, using neutral composite");
            return QualityReport::degraded(ScoreDegraded::SpectralFailure);
        }

        let bin_hz = audio.sample_rate as f32 / self.stft.window_size() as f32;

        let clarity = clip01(band_energy_fraction(&spec, bin_hz, total_energy));
        let dynamic_range = clip01(dynamic_range(&audio.samples));
        let rolloff = clip01(mean_rolloff(&spec, bin_hz) / ROLLOFF_NORM_HZ);
        let articulation = clip01(dsp::zero_crossing_rate(&audio.samples) * 15.0);
        let harmonicity = clip01(harmonic_fraction(&spec));

        let raw = W_CLARITY * clarity
            + W_DYNAMIC * dynamic_range
            + W_ROLLOFF * rolloff
            + W_ARTICULATION * articulation
            + W_HARMONICITY * harmonicity;
        let composite = ((raw as f64 * 100.0).round() / 100.0).clamp(0.0, 1.0);

        log::debug!(
            "quality {:.2}: clarity {:.2} dynamic {:.2} rolloff {:.2} articulation {:.2} harmonicity {:.2}",
            composite,
            clarity,
            dynamic_range,
            rolloff,
            articulation,
            harmonicity
        );

        QualityReport {
            clarity,
            dynamic_range,
            rolloff,
            articulation,
            harmonicity,
            composite,
            degraded: None,
        }
    }
}

fn clip01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Fraction of spectral energy inside the speech band.
fn band_energy_fraction(spec: &Spectrogram, bin_hz: f32, total_energy: f32) -> f32 {
    let low_bin = (SPEECH_BAND_LOW_HZ / bin_hz).ceil() as usize;
    let high_bin = ((SPEECH_BAND_HIGH_HZ / bin_hz).floor() as usize).min(spec.bins().saturating_sub(1));
    if low_bin > high_bin {
        return 0.0;
    }

    let band: f32 = spec
        .magnitudes
        .iter()
        .map(|frame| frame[low_bin..=high_bin].iter().map(|m| m * m).sum::<f32>())
        .sum();
    band / total_energy
}

/// Coefficient of variation of frame RMS, scaled by 2.
fn dynamic_range(samples: &[f32]) -> f32 {
    let energies = dsp::frame_rms(samples);
    if energies.len() < 2 {
        return 0.0;
    }
    let mean = energies.iter().sum::<f32>() / energies.len() as f32;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance =
        energies.iter().map(|e| (e - mean).powi(2)).sum::<f32>() / energies.len() as f32;
    (variance.sqrt() / mean) * 2.0
}

/// Mean 85 % spectral rolloff frequency across frames, in Hz.
fn mean_rolloff(spec: &Spectrogram, bin_hz: f32) -> f32 {
    let mut sum = 0.0f32;
    let mut counted = 0usize;

    for frame in &spec.magnitudes {
        let energy: Vec<f32> = frame.iter().map(|m| m * m).collect();
        let total: f32 = energy.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let target = total * ROLLOFF_FRACTION;
        let mut cumulative = 0.0f32;
        let mut rolloff_bin = energy.len() - 1;
        for (bin, &e) in energy.iter().enumerate() {
            cumulative += e;
            if cumulative >= target {
                rolloff_bin = bin;
                break;
            }
        }
        sum += rolloff_bin as f32 * bin_hz;
        counted += 1;
    }

    if counted == 0 {
        return 0.0;
    }
    sum / counted as f32
}

/// Harmonic energy fraction via median-filter harmonic/percussive separation.
///
/// Harmonic content is steady across time; percussive content is broadband
/// within a frame. Median-filtering the magnitude plane along each axis
/// yields the two enhanced planes, combined with the soft mask
/// `H^2 / (H^2 + P^2)`.
fn harmonic_fraction(spec: &Spectrogram) -> f32 {
    let frames = spec.frames();
    let bins = spec.bins();
    if frames == 0 || bins == 0 {
        return 0.0;
    }

    let half = HPSS_KERNEL / 2;
    let mut masked = 0.0f32;
    let mut total = 0.0f32;
    let mut window = Vec::with_capacity(HPSS_KERNEL);

    for t in 0..frames {
        for k in 0..bins {
            // Harmonic estimate: median across time at fixed frequency.
            window.clear();
            let t_lo = t.saturating_sub(half);
            let t_hi = (t + half + 1).min(frames);
            for ti in t_lo..t_hi {
                window.push(spec.magnitudes[ti][k]);
            }
            let h = median(&mut window);

            // Percussive estimate: median across frequency within the frame.
            window.clear();
            let k_lo = k.saturating_sub(half);
            let k_hi = (k + half + 1).min(bins);
            window.extend_from_slice(&spec.magnitudes[t][k_lo..k_hi]);
            let p = median(&mut window);

            let h2 = h * h;
            let p2 = p * p;
            let mask = if h2 + p2 > 0.0 { h2 / (h2 + p2) } else { 0.0 };

            let energy = spec.magnitudes[t][k] * spec.magnitudes[t][k];
            masked += mask * energy;
            total += energy;
        }
    }

    if total <= 0.0 {
        return 0.0;
    }
    masked / total
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn scorer() -> QualityScorer {
        QualityScorer::new(Stft::new(2048, 512))
    }

    fn sine(freq: f32, n: usize, sample_rate: u32) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.3)
            .collect()
    }

    fn white_noise(n: usize) -> Vec<f32> {
        let mut state = 0x1234_5678u32;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                ((state >> 16) as f32 / 65_535.0 - 0.5) * 0.6
            })
            .collect()
    }

    #[test]
    fn test_empty_input_degraded() {
        let report = scorer().score(&AudioBuffer::new(vec![], 22_050));
        assert_eq!(report.degraded, Some(ScoreDegraded::EmptyInput));
        assert_eq!(report.composite, 0.6);
    }

    #[test]
    fn test_silent_input_degraded() {
        let report = scorer().score(&AudioBuffer::new(vec![0.0; 22_050], 22_050));
        assert_eq!(report.degraded, Some(ScoreDegraded::SilentInput));
        assert_eq!(report.composite, 0.6);
    }

    #[test]
    fn test_composite_in_range_and_rounded() {
        let audio = AudioBuffer::new(sine(220.0, 44_100, 22_050), 22_050);
        let report = scorer().score(&audio);
        assert!(report.degraded.is_none());
        assert!((0.0..=1.0).contains(&report.composite));
        // Two-decimal rounding leaves no residue.
        assert_eq!((report.composite * 100.0).round() / 100.0, report.composite);
    }

    #[test]
    fn test_deterministic() {
        let audio = AudioBuffer::new(white_noise(44_100), 22_050);
        let a = scorer().score(&audio);
        let b = scorer().score(&audio);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tone_more_harmonic_than_noise() {
        let tone = AudioBuffer::new(sine(220.0, 44_100, 22_050), 22_050);
        let noise = AudioBuffer::new(white_noise(44_100), 22_050);
        let tone_report = scorer().score(&tone);
        let noise_report = scorer().score(&noise);
        assert!(
            tone_report.harmonicity > noise_report.harmonicity,
            "tone {} vs noise {}",
            tone_report.harmonicity,
            noise_report.harmonicity
        );
    }

    #[test]
    fn test_in_band_tone_has_high_clarity() {
        // 1 kHz sits inside the 300-3400 Hz band.
        let audio = AudioBuffer::new(sine(1000.0, 44_100, 22_050), 22_050);
        let report = scorer().score(&audio);
        assert!(report.clarity > 0.8, "clarity {}", report.clarity);
    }

    #[test]
    fn test_out_of_band_tone_has_low_clarity() {
        let audio = AudioBuffer::new(sine(8000.0, 44_100, 22_050), 22_050);
        let report = scorer().score(&audio);
        assert!(report.clarity < 0.2, "clarity {}", report.clarity);
    }

    #[test]
    fn test_noise_rolloff_exceeds_tone_rolloff() {
        let tone = AudioBuffer::new(sine(220.0, 44_100, 22_050), 22_050);
        let noise = AudioBuffer::new(white_noise(44_100), 22_050);
        let tone_report = scorer().score(&tone);
        let noise_report = scorer().score(&noise);
        assert!(noise_report.rolloff > tone_report.rolloff);
    }

    #[test]
    fn test_sub_scores_clipped() {
        let audio = AudioBuffer::new(white_noise(44_100), 22_050);
        let r = scorer().score(&audio);
        for v in [r.clarity, r.dynamic_range, r.rolloff, r.articulation, r.harmonicity] {
            assert!((0.0..=1.0).contains(&v), "sub-score out of range: {}", v);
        }
    }
}
