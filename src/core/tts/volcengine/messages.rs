//! Request envelope and voice parameters for the Volcengine TTS API.
//!
//! The envelope is the JSON document compressed into every request frame:
//!
//! ```json
//! {
//!   "app": {"appid": "...", "token": "access_token", "cluster": "volcano_tts"},
//!   "user": {"uid": "388808087185088"},
//!   "audio": {"voice_type": "zh_female_linjia_mars_bigtts", "encoding": "mp3",
//!             "speed_ratio": 1.0, "volume_ratio": 1.0, "pitch_ratio": 1.0},
//!   "request": {"reqid": "<uuid-v4>", "text": "...", "text_type": "plain", "operation": "submit"}
//! }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::VolcengineTtsConfig;
use super::{
    DEFAULT_TEXT_TYPE, DEFAULT_VOICE_TYPE, ENVELOPE_TOKEN, MAX_PITCH_RATIO, MAX_SPEED_RATIO,
    MAX_VOLUME_RATIO, MIN_PITCH_RATIO, MIN_SPEED_RATIO, MIN_VOLUME_RATIO,
};
use crate::core::tts::base::TTSError;

// =============================================================================
// Audio Encoding
// =============================================================================

/// Output audio container/codec requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    #[default]
    Mp3,
    Wav,
    Pcm,
    OggOpus,
}

impl AudioEncoding {
    /// Wire name of the encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
            Self::OggOpus => "ogg_opus",
        }
    }

    /// MIME type of audio produced with this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/pcm",
            Self::OggOpus => "audio/ogg",
        }
    }

    /// Parse a wire name, falling back to mp3 for unknown values.
    pub fn from_str_or_default(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "wav" => Self::Wav,
            "pcm" | "linear16" => Self::Pcm,
            "ogg_opus" | "opus" | "ogg" => Self::OggOpus,
            _ => Self::Mp3,
        }
    }
}

// =============================================================================
// Voice Parameters
// =============================================================================

/// Per-request voice settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub voice_type: String,
    #[serde(default)]
    pub encoding: AudioEncoding,
    #[serde(default = "default_ratio")]
    pub speed_ratio: f32,
    #[serde(default = "default_ratio")]
    pub volume_ratio: f32,
    #[serde(default = "default_ratio")]
    pub pitch_ratio: f32,
}

fn default_ratio() -> f32 {
    1.0
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::new(DEFAULT_VOICE_TYPE)
    }
}

impl VoiceParams {
    pub fn new(voice_type: impl Into<String>) -> Self {
        Self {
            voice_type: voice_type.into(),
            encoding: AudioEncoding::Mp3,
            speed_ratio: 1.0,
            volume_ratio: 1.0,
            pitch_ratio: 1.0,
        }
    }

    pub fn with_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_speed_ratio(mut self, speed_ratio: f32) -> Self {
        self.speed_ratio = speed_ratio;
        self
    }

    pub fn with_volume_ratio(mut self, volume_ratio: f32) -> Self {
        self.volume_ratio = volume_ratio;
        self
    }

    pub fn with_pitch_ratio(mut self, pitch_ratio: f32) -> Self {
        self.pitch_ratio = pitch_ratio;
        self
    }

    /// Check the parameters against the limits the service accepts.
    pub fn validate(&self) -> Result<(), TTSError> {
        if self.voice_type.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "voice_type must not be empty".to_string(),
            ));
        }
        check_range("speed_ratio", self.speed_ratio, MIN_SPEED_RATIO, MAX_SPEED_RATIO)?;
        check_range("volume_ratio", self.volume_ratio, MIN_VOLUME_RATIO, MAX_VOLUME_RATIO)?;
        check_range("pitch_ratio", self.pitch_ratio, MIN_PITCH_RATIO, MAX_PITCH_RATIO)?;
        Ok(())
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), TTSError> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(TTSError::InvalidConfiguration(format!(
            "{name} {value} is outside supported range ({min}-{max})"
        )));
    }
    Ok(())
}

// =============================================================================
// Request Envelope
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSection {
    pub appid: String,
    pub token: String,
    pub cluster: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSection {
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSection {
    pub voice_type: String,
    pub encoding: String,
    pub speed_ratio: f32,
    pub volume_ratio: f32,
    pub pitch_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSection {
    pub reqid: String,
    pub text: String,
    pub text_type: String,
    pub operation: String,
}

/// JSON body of a synthesis request. One envelope per synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub app: AppSection,
    pub user: UserSection,
    pub audio: AudioSection,
    pub request: RequestSection,
}

impl RequestEnvelope {
    /// Build the envelope for one synthesis call with a fresh request id.
    pub fn build(config: &VolcengineTtsConfig, text: &str, voice: &VoiceParams) -> Self {
        Self {
            app: AppSection {
                appid: config.app_id.clone(),
                token: ENVELOPE_TOKEN.to_string(),
                cluster: config.cluster.clone(),
            },
            user: UserSection {
                uid: config.uid.clone(),
            },
            audio: AudioSection {
                voice_type: voice.voice_type.clone(),
                encoding: voice.encoding.as_str().to_string(),
                speed_ratio: voice.speed_ratio,
                volume_ratio: voice.volume_ratio,
                pitch_ratio: voice.pitch_ratio,
            },
            request: RequestSection {
                reqid: Uuid::new_v4().to_string(),
                text: text.to_string(),
                text_type: DEFAULT_TEXT_TYPE.to_string(),
                operation: config.operation.clone(),
            },
        }
    }

    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request.reqid
    }
}
