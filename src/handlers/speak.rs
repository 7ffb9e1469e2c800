use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{VoiceOverrides, audio_response};
use crate::core::tts::volcengine::voices::is_known_voice;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /api/tts`.
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    /// Voice type; the configured default when absent.
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub pitch: Option<f32>,
    /// `mp3` (default), `wav`, `pcm` or `ogg_opus`.
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Synthesize `text` and return the audio bytes.
pub async fn speak_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpeakRequest>,
) -> AppResult<Response> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput(
            "text must not be empty".to_string(),
        ));
    }

    let voice = VoiceOverrides {
        voice_type: request.voice.as_deref(),
        speed_ratio: request.speed,
        volume_ratio: request.volume,
        pitch_ratio: request.pitch,
        encoding: request.encoding.as_deref(),
    }
    .apply(state.config.default_voice())?;

    if !is_known_voice(&voice.voice_type) {
        warn!("Voice {} is not in the catalog", voice.voice_type);
    }

    let tts = state.tts()?;
    info!(
        "Synthesizing {} chars with voice {}",
        text.chars().count(),
        voice.voice_type
    );

    let audio = tts.synthesize(text, &voice).await?;
    Ok(audio_response(audio, voice.encoding))
}
