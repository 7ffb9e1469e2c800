//! HTTP routes exercised in-process with `tower::ServiceExt::oneshot`.
//!
//! Run with: cargo test --test api_routes

mod mock_providers;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use mock_providers::{MockBehavior, VolcengineMock};
use podcast_gateway::{AppState, ServerConfig, routes};
use serde_json::{Value, json};
use tower::ServiceExt;

fn unconfigured_app() -> Router {
    let state = AppState::new(ServerConfig::default()).unwrap();
    routes::api::create_app_router().with_state(state)
}

fn configured_app(mock: &VolcengineMock) -> (Router, Arc<AppState>) {
    let mut config = ServerConfig::default();
    config.volcengine_app_id = Some("app-123".to_string());
    config.volcengine_access_token = Some("secret-token".to_string());
    config.volcengine_cluster = Some("volcano_tts".to_string());
    config.tts_endpoint = mock.endpoint();
    config.tts_timeout_seconds = 5;
    config.dialogue_voice_a = "voice-a".to_string();
    config.dialogue_voice_b = "voice-b".to_string();

    let state = AppState::new(config).unwrap();
    let app = routes::api::create_app_router().with_state(state.clone());
    (app, state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = unconfigured_app().oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "OK" }));
}

#[tokio::test]
async fn test_list_voices() {
    let response = unconfigured_app().oneshot(get("/api/voices")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    let voices = body["voices"].as_array().unwrap();
    assert!(!voices.is_empty());
    assert!(
        voices
            .iter()
            .any(|v| v["id"] == "zh_female_linjia_mars_bigtts")
    );
}

#[tokio::test]
async fn test_synthesis_without_credentials_is_unavailable() {
    let response = unconfigured_app()
        .oneshot(post_json("/api/tts", json!({ "text": "你好" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "not_configured");
}

#[tokio::test]
async fn test_empty_text_is_rejected() {
    let response = unconfigured_app()
        .oneshot(post_json("/api/tts", json!({ "text": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn test_out_of_range_speed_is_rejected() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![b"x".to_vec()])).await;
    let (app, _) = configured_app(&mock);

    let response = app
        .oneshot(post_json("/api/tts", json!({ "text": "你好", "speed": 9.0 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.connections_opened(), 0);
}

#[tokio::test]
async fn test_speak_returns_audio() {
    let mock =
        VolcengineMock::start(MockBehavior::Stream(vec![b"ID3".to_vec(), b"-data".to_vec()])).await;
    let (app, _) = configured_app(&mock);

    let response = app
        .oneshot(post_json(
            "/api/tts",
            json!({ "text": "你好", "voice": "ICL_zh_male_cixingnansang_tob" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ID3-data");
    assert_eq!(
        mock.envelopes()[0]["audio"]["voice_type"],
        "ICL_zh_male_cixingnansang_tob"
    );
}

#[tokio::test]
async fn test_server_error_maps_to_bad_gateway() {
    let mock = VolcengineMock::start(MockBehavior::Error {
        code: 3001,
        message: "invalid voice_type".to_string(),
    })
    .await;
    let (app, _) = configured_app(&mock);

    let response = app
        .oneshot(post_json("/api/tts", json!({ "text": "你好" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["code"], "server_error");
}

#[tokio::test]
async fn test_single_mode_podcast() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![b"podcast".to_vec()])).await;
    let (app, _) = configured_app(&mock);

    let response = app
        .oneshot(post_json(
            "/api/podcast/synthesize-audio",
            json!({ "script": "大家好，欢迎收听。", "voiceType": "voice-x" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"podcast");
    assert_eq!(mock.envelopes()[0]["audio"]["voice_type"], "voice-x");
}

#[tokio::test]
async fn test_dialogue_mode_podcast() {
    let mock = VolcengineMock::start_scripted(vec![
        MockBehavior::Stream(vec![b"[A]".to_vec()]),
        MockBehavior::Stream(vec![b"[B]".to_vec()]),
    ])
    .await;
    let (app, _) = configured_app(&mock);

    let response = app
        .oneshot(post_json(
            "/api/podcast/synthesize-audio",
            json!({
                "script": "主持人A：欢迎收听。\n主持人B：很高兴来到这里。",
                "podcast_mode": "dialogue"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-segment-count").unwrap(), "2");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"[A][B]");

    let voices: Vec<_> = mock
        .envelopes()
        .iter()
        .map(|e| e["audio"]["voice_type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(voices, vec!["voice-a", "voice-b"]);
}

#[tokio::test]
async fn test_dialogue_failure_reports_segment_index() {
    let mock = VolcengineMock::start_scripted(vec![
        MockBehavior::Stream(vec![b"[A]".to_vec()]),
        MockBehavior::Error {
            code: 3050,
            message: "text too long".to_string(),
        },
    ])
    .await;
    let (app, _) = configured_app(&mock);

    let response = app
        .oneshot(post_json(
            "/api/podcast/synthesize-audio",
            json!({
                "script": "主持人A：欢迎收听。\n主持人B：很高兴来到这里。\n主持人A：我们开始吧。",
                "podcastMode": "dialogue"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["segment_index"], 1);
    assert_eq!(body["code"], "server_error");
    assert_eq!(mock.connections_opened(), 2);
}

#[tokio::test]
async fn test_dialogue_without_host_lines_is_rejected() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![b"x".to_vec()])).await;
    let (app, _) = configured_app(&mock);

    let response = app
        .oneshot(post_json(
            "/api/podcast/synthesize-audio",
            json!({ "script": "只是一段旁白。", "podcast_mode": "dialogue" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.connections_opened(), 0);
}

#[tokio::test]
async fn test_connection_test_route() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![vec![7u8; 64]])).await;
    let (app, state) = configured_app(&mock);
    assert!(state.config.has_tts_credentials());

    let response = app.oneshot(get("/api/test")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["audio_bytes"], 64);
}

#[tokio::test]
async fn test_connection_test_route_rejects_empty_audio() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![Vec::new()])).await;
    let (app, _) = configured_app(&mock);

    let response = app.oneshot(get("/api/test")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "connection_error");
}
