use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{VoiceOverrides, audio_response};
use crate::core::dialogue::{HOST_A, HOST_B, parse_dialogue_script};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Number of dialogue segments synthesized, set on dialogue responses.
pub const SEGMENT_COUNT_HEADER: &str = "x-segment-count";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodcastMode {
    #[default]
    Single,
    Dialogue,
}

/// Body of `POST /api/podcast/synthesize-audio`.
#[derive(Debug, Deserialize)]
pub struct SynthesizeAudioRequest {
    pub script: String,
    #[serde(default, alias = "podcastMode")]
    pub podcast_mode: PodcastMode,
    #[serde(default, alias = "voiceType")]
    pub voice_type: Option<String>,
    #[serde(default, alias = "voiceA")]
    pub voice_a: Option<String>,
    #[serde(default, alias = "voiceB")]
    pub voice_b: Option<String>,
    #[serde(default, alias = "speedRatio")]
    pub speed_ratio: Option<f32>,
    #[serde(default, alias = "volumeRatio")]
    pub volume_ratio: Option<f32>,
}

/// Synthesize a podcast script.
///
/// Single mode reads the whole script with one voice. Dialogue mode splits the
/// script by `主持人A` / `主持人B` markers and stitches the per-line audio.
pub async fn synthesize_audio(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SynthesizeAudioRequest>,
) -> AppResult<Response> {
    let script = request.script.trim();
    if script.is_empty() {
        return Err(AppError::InvalidInput(
            "script must not be empty".to_string(),
        ));
    }

    match request.podcast_mode {
        PodcastMode::Single => synthesize_single(&state, script, &request).await,
        PodcastMode::Dialogue => synthesize_dialogue(&state, script, &request).await,
    }
}

async fn synthesize_single(
    state: &AppState,
    script: &str,
    request: &SynthesizeAudioRequest,
) -> AppResult<Response> {
    let voice = VoiceOverrides {
        voice_type: request.voice_type.as_deref().or(request.voice_a.as_deref()),
        speed_ratio: request.speed_ratio,
        volume_ratio: request.volume_ratio,
        ..Default::default()
    }
    .apply(state.config.default_voice())?;

    let tts = state.tts()?;
    info!("Synthesizing single-voice podcast ({} chars)", script.chars().count());

    let audio = tts.synthesize(script, &voice).await?;
    Ok(audio_response(audio, voice.encoding))
}

async fn synthesize_dialogue(
    state: &AppState,
    script: &str,
    request: &SynthesizeAudioRequest,
) -> AppResult<Response> {
    let segments = parse_dialogue_script(script);
    if segments.is_empty() {
        return Err(AppError::InvalidInput(
            "no 主持人A / 主持人B lines found in dialogue script".to_string(),
        ));
    }

    let mut voices = state.config.dialogue_voices();
    for (speaker, voice_type) in [(HOST_A, &request.voice_a), (HOST_B, &request.voice_b)] {
        if let Some(base) = voices.remove(speaker) {
            let voice = VoiceOverrides {
                voice_type: voice_type.as_deref(),
                speed_ratio: request.speed_ratio,
                volume_ratio: request.volume_ratio,
                ..Default::default()
            }
            .apply(base)?;
            voices.insert(speaker.to_string(), voice);
        }
    }

    let tts = state.tts()?;
    info!("Synthesizing dialogue podcast of {} segments", segments.len());

    let audio = tts.synthesize_sequence(&segments, &voices).await?;

    let encoding = voices
        .get(HOST_A)
        .map(|v| v.encoding)
        .unwrap_or_default();
    let mut response = audio_response(audio, encoding);
    response.headers_mut().insert(
        HeaderName::from_static(SEGMENT_COUNT_HEADER),
        HeaderValue::from(segments.len()),
    );
    Ok(response)
}
