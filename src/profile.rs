//! Voice profiles and their on-disk store.
//!
//! Layout under the storage root:
//!
//! ```text
//! voices/<voice_id>/sample.wav    canonical reference sample
//! voices/<voice_id>/profile.json  profile sidecar
//! audio/<audio_id>.wav            synthesized output
//! audio/<audio_id>.json           synthesis metadata sidecar
//! ```
//!
//! Deleting a profile removes the whole voice directory, so a sample can
//! never outlive its profile.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::{io, AudioBuffer};
use crate::error::StoreError;
use crate::text::TextStats;

const SAMPLE_FILE_NAME: &str = "sample.wav";
const PROFILE_FILE_NAME: &str = "profile.json";

/// A stored voice identity: who the voice is plus facts about its sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub language: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Duration of the uploaded sample in seconds.
    pub sample_duration: f64,
    /// Composite quality score in [0, 1].
    pub quality_score: f64,
    pub sample_rate: u32,
    /// Sample file name relative to the voice directory.
    pub sample_file: String,
}

impl VoiceProfile {
    pub fn new(
        voice_id: String,
        name: String,
        description: Option<String>,
        language: String,
        sample_duration: f64,
        quality_score: f64,
        sample_rate: u32,
    ) -> Self {
        Self {
            voice_id,
            name,
            description,
            language,
            created_at: chrono::Utc::now().to_rfc3339(),
            sample_duration,
            quality_score,
            sample_rate,
            sample_file: SAMPLE_FILE_NAME.to_string(),
        }
    }
}

/// Sidecar metadata written next to synthesized audio files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub audio_id: String,
    pub voice_id: String,
    pub text: String,
    /// Counts and estimated speaking time of the cleaned text.
    pub stats: TextStats,
    pub language: String,
    pub created_at: String,
    pub sample_rate: u32,
    /// "primary" or "fallback".
    pub method: String,
    /// Speaking-rate factor applied after synthesis (1.0 = natural).
    pub speed: f32,
}

/// Filesystem-backed store for profiles and synthesized audio.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    voices_dir: PathBuf,
    audio_dir: PathBuf,
}

impl ProfileStore {
    /// Open (and create if needed) the store under `root`.
    pub fn new(root: &Path) -> Result<Self, StoreError> {
        let voices_dir = root.join("voices");
        let audio_dir = root.join("audio");
        fs::create_dir_all(&voices_dir)?;
        fs::create_dir_all(&audio_dir)?;
        Ok(Self {
            voices_dir,
            audio_dir,
        })
    }

    fn voice_dir(&self, voice_id: &str) -> PathBuf {
        self.voices_dir.join(voice_id)
    }

    /// Path of a stored voice's reference sample.
    pub fn sample_path(&self, voice_id: &str) -> PathBuf {
        self.voice_dir(voice_id).join(SAMPLE_FILE_NAME)
    }

    /// Persist a profile and its canonical sample together.
    pub fn save(&self, profile: &VoiceProfile, sample: &AudioBuffer) -> Result<(), StoreError> {
        let dir = self.voice_dir(&profile.voice_id);
        fs::create_dir_all(&dir)?;

        io::write_wav(&dir.join(SAMPLE_FILE_NAME), sample)?;

        let json = serde_json::to_string_pretty(profile)?;
        fs::write(dir.join(PROFILE_FILE_NAME), json)?;

        log::info!("saved voice profile {} ({})", profile.voice_id, profile.name);
        Ok(())
    }

    pub fn load(&self, voice_id: &str) -> Result<VoiceProfile, StoreError> {
        let path = self.voice_dir(voice_id).join(PROFILE_FILE_NAME);
        if !path.exists() {
            return Err(StoreError::NotFound(voice_id.to_string()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load the stored reference sample for a voice.
    pub fn load_sample(&self, voice_id: &str) -> Result<AudioBuffer, StoreError> {
        let path = self.sample_path(voice_id);
        if !path.exists() {
            return Err(StoreError::NotFound(voice_id.to_string()));
        }
        Ok(io::read_wav(&path)?)
    }

    /// All stored profiles, in directory order. Unreadable entries are
    /// skipped with a warning rather than failing the listing.
    pub fn list(&self) -> Result<Vec<VoiceProfile>, StoreError> {
        let mut profiles = Vec::new();
        for entry in fs::read_dir(&self.voices_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let voice_id = entry.file_name().to_string_lossy().to_string();
            match self.load(&voice_id) {
                Ok(profile) => profiles.push(profile),
                Err(e) => log::warn!("skipping unreadable profile {}: {}", voice_id, e),
            }
        }
        Ok(profiles)
    }

    /// Remove a profile and everything stored with it.
    pub fn delete(&self, voice_id: &str) -> Result<(), StoreError> {
        let dir = self.voice_dir(voice_id);
        if !dir.exists() {
            return Err(StoreError::NotFound(voice_id.to_string()));
        }
        fs::remove_dir_all(dir)?;
        log::info!("deleted voice profile {}", voice_id);
        Ok(())
    }

    /// Overwrite a stored profile's quality score.
    pub fn update_quality(&self, voice_id: &str, quality_score: f64) -> Result<(), StoreError> {
        let mut profile = self.load(voice_id)?;
        profile.quality_score = quality_score;
        let json = serde_json::to_string_pretty(&profile)?;
        fs::write(self.voice_dir(voice_id).join(PROFILE_FILE_NAME), json)?;
        Ok(())
    }

    /// Persist synthesized audio and its metadata sidecar.
    ///
    /// Returns the path of the written WAV file.
    pub fn save_audio(
        &self,
        audio: &AudioBuffer,
        metadata: &AudioMetadata,
    ) -> Result<PathBuf, StoreError> {
        let wav_path = self.audio_dir.join(format!("{}.wav", metadata.audio_id));
        io::write_wav(&wav_path, audio)?;

        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(
            self.audio_dir.join(format!("{}.json", metadata.audio_id)),
            json,
        )?;

        Ok(wav_path)
    }
}
