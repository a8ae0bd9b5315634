//! WAV read/write via hound.
//!
//! Canonical samples and synthesized audio are stored as 32-bit float mono
//! WAV files.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::AudioBuffer;

/// Write a mono buffer as a 32-bit float WAV file.
pub fn write_wav(path: &Path, audio: &AudioBuffer) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// Read a WAV file into a mono buffer, mixing down multi-channel audio.
pub fn read_wav(path: &Path) -> Result<AudioBuffer, hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()?
        }
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(AudioBuffer::new(mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");

        let audio = AudioBuffer::new(vec![0.0, 0.25, -0.5, 0.99], 22_050);
        write_wav(&path, &audio).unwrap();

        let read = read_wav(&path).unwrap();
        assert_eq!(read.sample_rate, 22_050);
        assert_eq!(read.len(), 4);
        for (a, b) in read.samples.iter().zip(audio.samples.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_wav(Path::new("/nonexistent/file.wav"));
        assert!(result.is_err());
    }
}
