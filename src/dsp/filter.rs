//! IIR low-cut filtering.
//!
//! Cascaded 2nd-order Butterworth high-pass (4th order, 24 dB/octave) used to
//! strip rumble below the voice band before pre-emphasis.

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type, Q_BUTTERWORTH_F32};

use crate::error::SignalError;

/// Low-cut (high-pass) filter with a 24 dB/octave slope.
pub struct LowCutFilter {
    stages: [DirectForm1<f32>; 2],
}

impl LowCutFilter {
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Result<Self, SignalError> {
        let coeffs = Coefficients::<f32>::from_params(
            Type::HighPass,
            sample_rate.hz(),
            cutoff_hz.hz(),
            Q_BUTTERWORTH_F32,
        )
        .map_err(|e| SignalError::Filter(format!("high-pass at {} Hz: {:?}", cutoff_hz, e)))?;

        Ok(Self {
            stages: [
                DirectForm1::<f32>::new(coeffs),
                DirectForm1::<f32>::new(coeffs),
            ],
        })
    }

    /// Process samples in-place through both stages.
    pub fn process(&mut self, samples: &mut [f32]) {
        for stage in self.stages.iter_mut() {
            for sample in samples.iter_mut() {
                *sample = stage.run(*sample);
            }
        }
    }
}
