use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, podcast, speak, voices};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// Rate limiting, CORS and security headers are applied in main.rs.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/test", get(api::test_connection))
        .route("/api/voices", get(voices::list_voices))
        .route("/api/tts", post(speak::speak_handler))
        .route(
            "/api/podcast/synthesize-audio",
            post(podcast::synthesize_audio),
        )
        .layer(TraceLayer::new_for_http())
}

/// Full application router: public health check plus the API routes.
pub fn create_app_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .merge(create_api_router())
}
