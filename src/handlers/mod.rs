//! HTTP request handlers
//!
//! - `api` - Health check and TTS connection test
//! - `voices` - Voice catalog
//! - `speak` - Single-text synthesis
//! - `podcast` - Podcast script synthesis (single voice or two-host dialogue)

pub mod api;
pub mod podcast;
pub mod speak;
pub mod voices;

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::core::tts::volcengine::{AudioEncoding, VoiceParams};
use crate::errors::AppError;

/// Overrides a request may apply on top of a default voice.
#[derive(Debug, Default)]
pub(crate) struct VoiceOverrides<'a> {
    pub voice_type: Option<&'a str>,
    pub speed_ratio: Option<f32>,
    pub volume_ratio: Option<f32>,
    pub pitch_ratio: Option<f32>,
    pub encoding: Option<&'a str>,
}

impl VoiceOverrides<'_> {
    /// Apply the overrides to `base` and validate the result.
    pub(crate) fn apply(&self, mut base: VoiceParams) -> Result<VoiceParams, AppError> {
        if let Some(voice_type) = self.voice_type.map(str::trim).filter(|v| !v.is_empty()) {
            base.voice_type = voice_type.to_string();
        }
        if let Some(speed) = self.speed_ratio {
            base.speed_ratio = speed;
        }
        if let Some(volume) = self.volume_ratio {
            base.volume_ratio = volume;
        }
        if let Some(pitch) = self.pitch_ratio {
            base.pitch_ratio = pitch;
        }
        if let Some(encoding) = self.encoding {
            base.encoding = AudioEncoding::from_str_or_default(encoding);
        }
        base.validate()?;
        Ok(base)
    }
}

/// Binary audio response with the content type of `encoding`.
pub(crate) fn audio_response(audio: Bytes, encoding: AudioEncoding) -> Response {
    let mut response = (StatusCode::OK, Body::from(audio)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(encoding.content_type()),
    );
    response
}
