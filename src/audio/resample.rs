//! Sample-rate conversion using rubato.
//!
//! Sinc interpolation, processed in fixed-size chunks with a final partial
//! chunk and a flush of the resampler's internal delay line.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::AudioBuffer;
use crate::error::SignalError;

const CHUNK_SIZE: usize = 1024;

/// Resample a mono buffer to `target_rate`.
///
/// Returns a clone when the buffer is already at the target rate.
pub fn resample(audio: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, SignalError> {
    if audio.sample_rate == target_rate {
        return Ok(audio.clone());
    }
    if audio.is_empty() {
        return Ok(AudioBuffer::new(Vec::new(), target_rate));
    }

    let ratio = target_rate as f64 / audio.sample_rate as f64;

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
        .map_err(|e| SignalError::Resample(e.to_string()))?;

    let samples = &audio.samples;
    let mut output: Vec<f32> = Vec::with_capacity((samples.len() as f64 * ratio) as usize + 64);

    let mut pos = 0;
    while pos + CHUNK_SIZE <= samples.len() {
        let block = vec![samples[pos..pos + CHUNK_SIZE].to_vec()];
        let mut frames = resampler
            .process(&block, None)
            .map_err(|e| SignalError::Resample(e.to_string()))?;
        output.append(&mut frames[0]);
        pos += CHUNK_SIZE;
    }

    if pos < samples.len() {
        let block = vec![samples[pos..].to_vec()];
        let mut frames = resampler
            .process_partial(Some(&block), None)
            .map_err(|e| SignalError::Resample(e.to_string()))?;
        output.append(&mut frames[0]);
    }

    // Flush the sinc delay line so the tail is not dropped.
    let mut tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| SignalError::Resample(e.to_string()))?;
    output.append(&mut tail[0]);

    log::debug!(
        "resampled {} samples at {} Hz -> {} samples at {} Hz",
        samples.len(),
        audio.sample_rate,
        output.len(),
        target_rate
    );

    Ok(AudioBuffer::new(output, target_rate))
}
