//! Voice cloning engines and the profile/synthesis service.
//!
//! The engine capability is chosen once at startup and injected: a primary
//! engine wraps a real voice-cloning backend, the fallback wraps a plain TTS
//! collaborator and corrects its pitch toward the stored reference sample.

use std::path::Path;

use uuid::Uuid;

use crate::audio::AudioBuffer;
use crate::config::{PipelineConfig, ServiceConfig};
use crate::error::{ServiceError, SynthesisError};
use crate::intake::IntakePipeline;
use crate::pitch;
use crate::profile::{AudioMetadata, ProfileStore, VoiceProfile};
use crate::text::{detect_language, text_stats, Language, MarkupCleaner, TextCleaner};

/// Supported speech speed range, a factor of two each way.
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

/// How a piece of audio was synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMethod {
    /// Voice-cloning backend conditioned on the reference sample.
    Primary,
    /// Plain TTS with pitch transfer toward the reference.
    Fallback,
}

impl SynthesisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisMethod::Primary => "primary",
            SynthesisMethod::Fallback => "fallback",
        }
    }
}

/// Output of one synthesis call; the audio has already been persisted under
/// `audio_id` by the service.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub audio_id: Uuid,
    pub audio: AudioBuffer,
    pub sample_rate: u32,
    pub method: SynthesisMethod,
}

/// A backend that can condition synthesis on a reference speaker.
pub trait VoiceCloneBackend: Send + Sync {
    fn clone_voice(
        &self,
        text: &str,
        reference: &AudioBuffer,
        language: &str,
    ) -> Result<AudioBuffer, SynthesisError>;
}

/// A plain text-to-speech collaborator with no speaker conditioning.
pub trait BasicTts: Send + Sync {
    fn speak(&self, text: &str, language: &str) -> Result<AudioBuffer, SynthesisError>;
}

/// One synthesis capability, fixed at startup.
pub trait CloningEngine: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        reference: &AudioBuffer,
        language: &str,
    ) -> Result<AudioBuffer, SynthesisError>;

    fn method(&self) -> SynthesisMethod;
}

/// Engine backed by a real voice-cloning model.
pub struct PrimaryEngine<B: VoiceCloneBackend> {
    backend: B,
}

impl<B: VoiceCloneBackend> PrimaryEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: VoiceCloneBackend> CloningEngine for PrimaryEngine<B> {
    fn synthesize(
        &self,
        text: &str,
        reference: &AudioBuffer,
        language: &str,
    ) -> Result<AudioBuffer, SynthesisError> {
        self.backend.clone_voice(text, reference, language)
    }

    fn method(&self) -> SynthesisMethod {
        SynthesisMethod::Primary
    }
}

/// Engine backed by plain TTS; output pitch is shifted toward the reference
/// speaker's mean pitch so the result at least sits in the right register.
pub struct FallbackEngine<T: BasicTts> {
    tts: T,
}

impl<T: BasicTts> FallbackEngine<T> {
    pub fn new(tts: T) -> Self {
        Self { tts }
    }
}

impl<T: BasicTts> CloningEngine for FallbackEngine<T> {
    fn synthesize(
        &self,
        text: &str,
        reference: &AudioBuffer,
        language: &str,
    ) -> Result<AudioBuffer, SynthesisError> {
        let generated = self.tts.speak(text, language)?;
        Ok(pitch::transfer(reference, &generated))
    }

    fn method(&self) -> SynthesisMethod {
        SynthesisMethod::Fallback
    }
}

/// Profile creation and synthesis over one injected engine.
pub struct VoiceCloner {
    config: ServiceConfig,
    pipeline: IntakePipeline,
    store: ProfileStore,
    engine: Box<dyn CloningEngine>,
    cleaner: Box<dyn TextCleaner>,
}

impl VoiceCloner {
    pub fn new(
        config: ServiceConfig,
        pipeline_config: PipelineConfig,
        engine: Box<dyn CloningEngine>,
    ) -> Result<Self, ServiceError> {
        let store = ProfileStore::new(&config.storage_root)?;
        Ok(Self {
            config,
            pipeline: IntakePipeline::new(pipeline_config),
            store,
            engine,
            cleaner: Box::new(MarkupCleaner),
        })
    }

    /// Same as `new` with an explicit storage root, for embedding.
    pub fn with_storage_root(
        mut config: ServiceConfig,
        pipeline_config: PipelineConfig,
        engine: Box<dyn CloningEngine>,
        root: &Path,
    ) -> Result<Self, ServiceError> {
        config.storage_root = root.to_path_buf();
        Self::new(config, pipeline_config, engine)
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Run intake on an uploaded sample and persist the resulting profile.
    pub fn create_profile(
        &self,
        name: &str,
        description: Option<&str>,
        language: &str,
        bytes: &[u8],
    ) -> Result<VoiceProfile, ServiceError> {
        if !self.config.is_language_supported(language) {
            return Err(SynthesisError::UnsupportedLanguage(language.to_string()).into());
        }

        let sample = self.pipeline.process(bytes)?;

        let profile = VoiceProfile::new(
            Uuid::new_v4().to_string(),
            name.to_string(),
            description.map(str::to_string),
            language.to_string(),
            sample.duration,
            sample.quality.composite,
            sample.buffer.sample_rate,
        );
        self.store.save(&profile, &sample.buffer)?;
        Ok(profile)
    }

    /// Synthesize text in a stored voice and persist the result.
    ///
    /// When `language` is `None` it is detected from the text, falling back
    /// to the profile's language. `speed` scales speaking rate (1.0 is
    /// natural) and must lie within [`MIN_SPEED`, `MAX_SPEED`].
    pub fn synthesize(
        &self,
        voice_id: &str,
        text: &str,
        language: Option<&str>,
        speed: Option<f32>,
    ) -> Result<SynthesisResult, ServiceError> {
        if text.chars().count() > self.config.max_text_length {
            return Err(ServiceError::TextTooLong {
                len: text.chars().count(),
                max: self.config.max_text_length,
            });
        }

        let speed = speed.unwrap_or(1.0);
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(SynthesisError::InvalidSpeed(speed).into());
        }

        let profile = self.store.load(voice_id)?;
        let reference = self.store.load_sample(voice_id)?;

        let cleaned = self.cleaner.clean(text);
        if cleaned.is_empty() {
            return Err(SynthesisError::EmptyText.into());
        }

        let language = match language {
            Some(lang) => {
                if !self.config.is_language_supported(lang) {
                    return Err(SynthesisError::UnsupportedLanguage(lang.to_string()).into());
                }
                lang.to_string()
            }
            None => match detect_language(&cleaned) {
                Language::Unknown => profile.language.clone(),
                detected => detected.code().to_string(),
            },
        };

        log::debug!(
            "synthesizing {} chars for voice {} in {} via {}",
            cleaned.chars().count(),
            voice_id,
            language,
            self.engine.method().as_str()
        );

        let audio = self.engine.synthesize(&cleaned, &reference, &language)?;

        // Speed control is a post-processing stretch, the same on both
        // engine paths.
        let audio = if speed != 1.0 {
            pitch::time_stretch(&audio, speed)
                .map_err(|e| SynthesisError::Backend(format!("speed adjustment: {}", e)))?
        } else {
            audio
        };

        let audio_id = Uuid::new_v4();
        let metadata = AudioMetadata {
            audio_id: audio_id.to_string(),
            voice_id: voice_id.to_string(),
            stats: text_stats(&cleaned),
            text: cleaned,
            language,
            created_at: chrono::Utc::now().to_rfc3339(),
            sample_rate: audio.sample_rate,
            method: self.engine.method().as_str().to_string(),
            speed,
        };
        self.store.save_audio(&audio, &metadata)?;

        Ok(SynthesisResult {
            audio_id,
            sample_rate: audio.sample_rate,
            audio,
            method: self.engine.method(),
        })
    }

    pub fn list_profiles(&self) -> Result<Vec<VoiceProfile>, ServiceError> {
        Ok(self.store.list()?)
    }

    pub fn delete_profile(&self, voice_id: &str) -> Result<(), ServiceError> {
        Ok(self.store.delete(voice_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::io::Cursor;

    struct FixedBackend;

    impl VoiceCloneBackend for FixedBackend {
        fn clone_voice(
            &self,
            _text: &str,
            reference: &AudioBuffer,
            _language: &str,
        ) -> Result<AudioBuffer, SynthesisError> {
            Ok(reference.clone())
        }
    }

    struct SineTts {
        freq: f32,
    }

    impl BasicTts for SineTts {
        fn speak(&self, _text: &str, _language: &str) -> Result<AudioBuffer, SynthesisError> {
            let sr = 22_050u32;
            let samples = (0..sr as usize)
                .map(|i| (2.0 * PI * self.freq * i as f32 / sr as f32).sin() * 0.4)
                .collect();
            Ok(AudioBuffer::new(samples, sr))
        }
    }

    fn sample_wav_bytes() -> Vec<u8> {
        let sr = 22_050u32;
        let samples: Vec<f32> = (0..sr as usize * 4)
            .map(|i| {
                let t = i as f32 / sr as f32;
                ((2.0 * PI * 200.0 * t).sin() * 0.4 + (2.0 * PI * 400.0 * t).sin() * 0.2)
                    * (0.6 + 0.4 * (2.0 * PI * 2.0 * t).sin())
            })
            .collect();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sr,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in &samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn cloner(root: &Path) -> VoiceCloner {
        VoiceCloner::with_storage_root(
            ServiceConfig::default(),
            PipelineConfig::default(),
            Box::new(PrimaryEngine::new(FixedBackend)),
            root,
        )
        .unwrap()
    }

    #[test]
    fn test_profile_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = cloner(dir.path());

        let profile = cloner
            .create_profile("Alice", Some("test voice"), "en", &sample_wav_bytes())
            .unwrap();
        assert_eq!(profile.sample_rate, 22_050);
        assert!((0.0..=1.0).contains(&profile.quality_score));

        assert_eq!(cloner.list_profiles().unwrap().len(), 1);
        cloner.delete_profile(&profile.voice_id).unwrap();
        assert!(cloner.list_profiles().unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_language_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = cloner(dir.path());
        let err = cloner
            .create_profile("Bob", None, "de", &sample_wav_bytes())
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Synthesis(SynthesisError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_synthesize_persists_output() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = cloner(dir.path());
        let profile = cloner
            .create_profile("Alice", None, "en", &sample_wav_bytes())
            .unwrap();

        let result = cloner
            .synthesize(&profile.voice_id, "The weather is nice today.", None, None)
            .unwrap();
        assert_eq!(result.method, SynthesisMethod::Primary);
        assert!(!result.audio.is_empty());

        let wav = dir
            .path()
            .join("audio")
            .join(format!("{}.wav", result.audio_id));
        assert!(wav.exists());

        let sidecar = wav.with_extension("json");
        assert!(sidecar.exists());
        let metadata: AudioMetadata =
            serde_json::from_str(&std::fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(metadata.speed, 1.0);
        assert_eq!(metadata.stats.words, 5);
        assert_eq!(metadata.stats.sentences, 1);
    }

    #[test]
    fn test_speed_stretches_output() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = cloner(dir.path());
        let profile = cloner
            .create_profile("Alice", None, "en", &sample_wav_bytes())
            .unwrap();

        let natural = cloner
            .synthesize(&profile.voice_id, "Hello there.", None, None)
            .unwrap();
        let slow = cloner
            .synthesize(&profile.voice_id, "Hello there.", None, Some(0.5))
            .unwrap();
        let fast = cloner
            .synthesize(&profile.voice_id, "Hello there.", None, Some(2.0))
            .unwrap();

        // Half speed roughly doubles the length, double speed halves it.
        let slow_ratio = slow.audio.len() as f32 / natural.audio.len() as f32;
        let fast_ratio = fast.audio.len() as f32 / natural.audio.len() as f32;
        assert!((slow_ratio - 2.0).abs() < 0.2, "slow ratio {}", slow_ratio);
        assert!((fast_ratio - 0.5).abs() < 0.2, "fast ratio {}", fast_ratio);

        let wav = dir
            .path()
            .join("audio")
            .join(format!("{}.wav", slow.audio_id));
        let metadata: AudioMetadata =
            serde_json::from_str(&std::fs::read_to_string(wav.with_extension("json")).unwrap())
                .unwrap();
        assert_eq!(metadata.speed, 0.5);
    }

    #[test]
    fn test_out_of_range_speed_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = cloner(dir.path());
        let profile = cloner
            .create_profile("Alice", None, "en", &sample_wav_bytes())
            .unwrap();

        for speed in [0.1, 3.0, -1.0, f32::NAN] {
            let err = cloner
                .synthesize(&profile.voice_id, "Hello.", None, Some(speed))
                .unwrap_err();
            assert!(
                matches!(err, ServiceError::Synthesis(SynthesisError::InvalidSpeed(_))),
                "speed {} not rejected",
                speed
            );
        }
    }

    #[test]
    fn test_text_length_limit() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = cloner(dir.path());
        let profile = cloner
            .create_profile("Alice", None, "en", &sample_wav_bytes())
            .unwrap();

        let long_text = "a".repeat(10_001);
        let err = cloner
            .synthesize(&profile.voice_id, &long_text, None, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::TextTooLong { .. }));
    }

    #[test]
    fn test_markup_only_text_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = cloner(dir.path());
        let profile = cloner
            .create_profile("Alice", None, "en", &sample_wav_bytes())
            .unwrap();

        let err = cloner
            .synthesize(&profile.voice_id, "*** ___ ***", None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Synthesis(SynthesisError::EmptyText)
        ));
    }

    #[test]
    fn test_fallback_engine_shifts_pitch() {
        // Reference around 200 Hz, TTS at 100 Hz; fallback should land the
        // output near the reference register.
        let sr = 22_050u32;
        let reference = AudioBuffer::new(
            (0..sr as usize)
                .map(|i| (2.0 * PI * 200.0 * i as f32 / sr as f32).sin() * 0.4)
                .collect(),
            sr,
        );
        let engine = FallbackEngine::new(SineTts { freq: 100.0 });
        let out = engine.synthesize("hello", &reference, "en").unwrap();

        let f0 = crate::pitch::PitchTracker::default().mean_f0(&out).unwrap();
        assert!((f0 - 200.0).abs() < 40.0, "estimated {}", f0);
        assert_eq!(engine.method(), SynthesisMethod::Fallback);
    }
}
