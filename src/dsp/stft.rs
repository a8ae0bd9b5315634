//! Short-time spectral transform.
//!
//! Hann-windowed real FFT frames with overlap-add reconstruction. Frames are
//! stored as separate magnitude and phase planes so callers can manipulate
//! magnitudes (denoising, time stretching) and resynthesize with the
//! original or accumulated phase.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::error::SignalError;

/// Per-frame magnitude and phase planes of a signal.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// One magnitude vector per frame, `window_size / 2 + 1` bins each.
    pub magnitudes: Vec<Vec<f32>>,
    /// Phase angles matching `magnitudes` in shape.
    pub phases: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn frames(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn bins(&self) -> usize {
        self.magnitudes.first().map(|m| m.len()).unwrap_or(0)
    }
}

/// Framed forward/inverse transform with fixed window and hop sizes.
#[derive(Clone)]
pub struct Stft {
    window_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl Stft {
    pub fn new(window_size: usize, hop_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(window_size);
        let inverse = planner.plan_fft_inverse(window_size);

        // Hann window
        let window: Vec<f32> = (0..window_size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / window_size as f32).cos())
            })
            .collect();

        Self {
            window_size,
            hop_size,
            window,
            forward,
            inverse,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Transform a signal into magnitude/phase frames.
    ///
    /// Signals shorter than one window are zero-padded to a single frame.
    pub fn forward(&self, samples: &[f32]) -> Result<Spectrogram, SignalError> {
        let padded;
        let samples = if samples.len() < self.window_size {
            padded = {
                let mut p = samples.to_vec();
                p.resize(self.window_size, 0.0);
                p
            };
            &padded[..]
        } else {
            samples
        };

        let mut magnitudes = Vec::new();
        let mut phases = Vec::new();

        let mut pos = 0;
        while pos + self.window_size <= samples.len() {
            let mut buffer: Vec<f32> = samples[pos..pos + self.window_size]
                .iter()
                .zip(&self.window)
                .map(|(s, w)| s * w)
                .collect();

            let mut spectrum = self.forward.make_output_vec();
            self.forward
                .process(&mut buffer, &mut spectrum)
                .map_err(|e| SignalError::Transform(e.to_string()))?;

            magnitudes.push(spectrum.iter().map(|c| c.norm()).collect());
            phases.push(spectrum.iter().map(|c| c.arg()).collect());

            pos += self.hop_size;
        }

        Ok(Spectrogram { magnitudes, phases })
    }

    /// Reconstruct a time-domain signal from magnitude/phase frames.
    ///
    /// Output length is `(frames - 1) * hop + window`; callers comparing
    /// against the analyzed signal must tolerate up to one hop of difference.
    pub fn inverse(&self, spec: &Spectrogram) -> Result<Vec<f32>, SignalError> {
        if spec.frames() == 0 {
            return Ok(Vec::new());
        }

        let out_len = (spec.frames() - 1) * self.hop_size + self.window_size;
        let mut output = vec![0.0f32; out_len];
        let mut window_sum = vec![0.0f32; out_len];
        let norm = 1.0 / self.window_size as f32;

        for (frame_idx, (mags, phases)) in
            spec.magnitudes.iter().zip(spec.phases.iter()).enumerate()
        {
            let mut spectrum: Vec<Complex<f32>> = mags
                .iter()
                .zip(phases.iter())
                .map(|(&m, &p)| Complex::from_polar(m, p))
                .collect();

            // The DC and Nyquist bins of a real signal carry no imaginary
            // part; clear the rounding residue left by from_polar.
            if let Some(first) = spectrum.first_mut() {
                first.im = 0.0;
            }
            if let Some(last) = spectrum.last_mut() {
                last.im = 0.0;
            }

            let mut time_buffer = self.inverse.make_output_vec();
            self.inverse
                .process(&mut spectrum, &mut time_buffer)
                .map_err(|e| SignalError::Transform(e.to_string()))?;

            let start = frame_idx * self.hop_size;
            for (i, sample) in time_buffer.iter().enumerate() {
                output[start + i] += sample * norm * self.window[i];
                window_sum[start + i] += self.window[i] * self.window[i];
            }
        }

        // Overlap-add normalization
        for (sample, wsum) in output.iter_mut().zip(window_sum.iter()) {
            if *wsum > 1e-3 {
                *sample /= *wsum;
            }
        }

        Ok(output)
    }
}
