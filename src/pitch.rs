//! Pitch tracking and pitch transfer.
//!
//! A YIN-style tracker estimates voice fundamental frequency; `transfer`
//! shifts a generated signal toward a reference speaker's mean pitch using a
//! phase-vocoder time stretch followed by resampling. Transfer is a
//! best-effort correction and never fails: when pitch cannot be estimated or
//! the shift cannot be applied, the generated audio is returned unchanged.

use crate::audio::{resample, AudioBuffer};
use crate::dsp::stft::{Spectrogram, Stft};
use crate::error::SignalError;

/// Pitch ratio clamp; one octave each way (+/- 12 semitones).
const MIN_PITCH_RATIO: f32 = 0.5;
const MAX_PITCH_RATIO: f32 = 2.0;

/// Shifts smaller than this are inaudible and skipped.
const MIN_SHIFT_SEMITONES: f32 = 0.1;

/// CMNDF aperiodicity limit above which a frame counts as unvoiced.
const VOICING_LIMIT: f32 = 0.5;

/// Frame-wise fundamental frequency estimator (YIN difference function with
/// cumulative mean normalization).
#[derive(Debug, Clone)]
pub struct PitchTracker {
    pub fmin: f32,
    pub fmax: f32,
    pub frame_size: usize,
    pub hop_size: usize,
    /// CMNDF threshold for the absolute-threshold pick.
    pub threshold: f32,
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self {
            fmin: 50.0,
            fmax: 400.0,
            frame_size: 2048,
            hop_size: 512,
            threshold: 0.15,
        }
    }
}

impl PitchTracker {
    /// Per-frame f0 estimates in Hz; unvoiced frames yield 0.0.
    pub fn track(&self, audio: &AudioBuffer) -> Vec<f32> {
        let sr = audio.sample_rate as f32;
        let tau_min = ((sr / self.fmax) as usize).max(2);
        let tau_max = ((sr / self.fmin) as usize).min(self.frame_size / 2);
        if tau_min >= tau_max || audio.len() < self.frame_size {
            return Vec::new();
        }

        // Correlation span; tau_max lags must stay inside the frame.
        let span = self.frame_size - tau_max;

        let mut estimates = Vec::new();
        let mut pos = 0;
        while pos + self.frame_size <= audio.len() {
            let frame = &audio.samples[pos..pos + self.frame_size];
            estimates.push(self.frame_f0(frame, span, tau_min, tau_max, sr));
            pos += self.hop_size;
        }
        estimates
    }

    fn frame_f0(&self, frame: &[f32], span: usize, tau_min: usize, tau_max: usize, sr: f32) -> f32 {
        // Difference function.
        let mut diff = vec![0.0f32; tau_max + 1];
        for tau in 1..=tau_max {
            let mut sum = 0.0f32;
            for j in 0..span {
                let d = frame[j] - frame[j + tau];
                sum += d * d;
            }
            diff[tau] = sum;
        }

        // Cumulative mean normalized difference.
        let mut cmndf = vec![1.0f32; tau_max + 1];
        let mut running = 0.0f32;
        for tau in 1..=tau_max {
            running += diff[tau];
            cmndf[tau] = if running > 0.0 {
                diff[tau] * tau as f32 / running
            } else {
                1.0
            };
        }

        // First dip under the threshold, descended to its local minimum;
        // otherwise the global minimum in range.
        let mut tau = tau_min;
        let mut best = tau_min;
        let mut found = false;
        while tau <= tau_max {
            if cmndf[tau] < self.threshold {
                while tau + 1 <= tau_max && cmndf[tau + 1] < cmndf[tau] {
                    tau += 1;
                }
                best = tau;
                found = true;
                break;
            }
            if cmndf[tau] < cmndf[best] {
                best = tau;
            }
            tau += 1;
        }

        if !found && cmndf[best] > VOICING_LIMIT {
            return 0.0;
        }

        // Parabolic interpolation around the picked lag.
        let refined = if best > tau_min && best < tau_max {
            let (a, b, c) = (cmndf[best - 1], cmndf[best], cmndf[best + 1]);
            let denom = a - 2.0 * b + c;
            if denom.abs() > 1e-12 {
                best as f32 + 0.5 * (a - c) / denom
            } else {
                best as f32
            }
        } else {
            best as f32
        };

        sr / refined
    }

    /// Mean of voiced f0 estimates, or `None` when nothing is voiced.
    pub fn mean_f0(&self, audio: &AudioBuffer) -> Option<f32> {
        let voiced: Vec<f32> = self
            .track(audio)
            .into_iter()
            .filter(|&f| f > 0.0)
            .collect();
        if voiced.is_empty() {
            return None;
        }
        Some(voiced.iter().sum::<f32>() / voiced.len() as f32)
    }
}

/// Semitone shift that moves `generated_f0` toward `reference_f0`.
///
/// The underlying pitch ratio is clamped to one octave in either direction,
/// so the result is always within [-12, 12].
pub fn compute_shift_semitones(reference_f0: f32, generated_f0: f32) -> f32 {
    let ratio = (reference_f0 / generated_f0).clamp(MIN_PITCH_RATIO, MAX_PITCH_RATIO);
    12.0 * ratio.log2()
}

/// Shift pitch by `semitones` without changing duration.
///
/// Phase-vocoder time stretch by `2^(-semitones/12)` followed by a sinc
/// resample back to the original rate.
pub fn pitch_shift(audio: &AudioBuffer, semitones: f32) -> Result<AudioBuffer, SignalError> {
    let rate = 2.0f32.powf(-semitones / 12.0);
    let stretched = stretch_samples(&audio.samples, rate)?;

    let intermediate_rate = (audio.sample_rate as f32 / rate).round() as u32;
    let shifted = resample::resample(
        &AudioBuffer::new(stretched, intermediate_rate),
        audio.sample_rate,
    )?;
    Ok(shifted)
}

/// Change playback speed by `rate` (>1 faster, <1 slower) without changing
/// pitch. Used both by `pitch_shift` and for caller-requested speed control.
pub fn time_stretch(audio: &AudioBuffer, rate: f32) -> Result<AudioBuffer, SignalError> {
    let samples = stretch_samples(&audio.samples, rate)?;
    Ok(AudioBuffer::new(samples, audio.sample_rate))
}

fn stretch_samples(samples: &[f32], rate: f32) -> Result<Vec<f32>, SignalError> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(SignalError::Transform(format!(
            "invalid stretch rate {}",
            rate
        )));
    }

    let stft = Stft::new(2048, 512);
    let spec = stft.forward(samples)?;
    if spec.frames() < 2 {
        return Ok(samples.to_vec());
    }

    let bins = spec.bins();
    let advance: Vec<f32> = (0..bins)
        .map(|k| {
            2.0 * std::f32::consts::PI * k as f32 * stft.hop_size() as f32
                / stft.window_size() as f32
        })
        .collect();

    let mut magnitudes = Vec::new();
    let mut phases = Vec::new();
    let mut phase_acc = spec.phases[0].clone();

    let mut t = 0.0f32;
    let last = (spec.frames() - 1) as f32;
    while t < last {
        let i = t as usize;
        let frac = t - i as f32;

        let frame: Vec<f32> = (0..bins)
            .map(|k| {
                spec.magnitudes[i][k] * (1.0 - frac) + spec.magnitudes[i + 1][k] * frac
            })
            .collect();

        magnitudes.push(frame);
        phases.push(phase_acc.clone());

        // Accumulate phase from the instantaneous frequency between the two
        // analysis frames bracketing this synthesis step.
        for k in 0..bins {
            let delta = spec.phases[i + 1][k] - spec.phases[i][k] - advance[k];
            let wrapped = delta - 2.0 * std::f32::consts::PI * (delta / (2.0 * std::f32::consts::PI)).round();
            phase_acc[k] += advance[k] + wrapped;
        }

        t += rate;
    }

    stft.inverse(&Spectrogram { magnitudes, phases })
}

/// Shift `generated` toward the mean pitch of `reference`.
///
/// Returns `generated` unchanged when either signal has no voiced frames,
/// when the shift is inaudible, or when shifting fails.
pub fn transfer(reference: &AudioBuffer, generated: &AudioBuffer) -> AudioBuffer {
    let tracker = PitchTracker::default();

    let reference_f0 = match tracker.mean_f0(reference) {
        Some(f0) => f0,
        None => {
            log::warn!("no voiced frames in reference, skipping pitch transfer");
            return generated.clone();
        }
    };
    let generated_f0 = match tracker.mean_f0(generated) {
        Some(f0) => f0,
        None => {
            log::warn!("no voiced frames in generated audio, skipping pitch transfer");
            return generated.clone();
        }
    };

    let shift = compute_shift_semitones(reference_f0, generated_f0);
    if shift.abs() < MIN_SHIFT_SEMITONES {
        log::debug!("pitch already matches ({:.1} Hz), no shift", reference_f0);
        return generated.clone();
    }

    log::info!(
        "pitch transfer: {:.1} Hz -> {:.1} Hz ({:+.2} semitones)",
        generated_f0,
        reference_f0,
        shift
    );

    match pitch_shift(generated, shift) {
        Ok(shifted) => shifted,
        Err(e) => {
            log::warn!("pitch shift failed ({}), returning unshifted audio", e);
            generated.clone()
        }
    }
}
