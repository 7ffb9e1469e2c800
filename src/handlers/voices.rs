use axum::response::Json;
use serde::Serialize;

use crate::core::tts::volcengine::{VoiceInfo, available_voices};

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub success: bool,
    pub voices: Vec<VoiceInfo>,
}

/// List the voices the account can synthesize with.
pub async fn list_voices() -> Json<VoicesResponse> {
    Json(VoicesResponse {
        success: true,
        voices: available_voices(),
    })
}
