use axum::{extract::State, response::Json};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::errors::AppResult;
use crate::state::AppState;

/// Health check
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// Synthesize a short test phrase to verify credentials and connectivity.
pub async fn test_connection(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let tts = state.tts()?;
    info!("Testing Volcengine TTS connection");

    let check = tts.check_connection(&state.config.default_voice()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "TTS connection test succeeded",
        "audio_bytes": check.audio_bytes,
    })))
}
