//! Session behaviour against a mock Volcengine endpoint.
//!
//! Run with: cargo test --test session_integration

mod mock_providers;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mock_providers::{MockBehavior, VolcengineMock};
use podcast_gateway::core::tts::volcengine::{
    SessionError, SessionObserver, SessionState, StreamSession, VoiceParams, VolcengineTts,
    VolcengineTtsConfig,
};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(3);

fn config_for(mock: &VolcengineMock) -> VolcengineTtsConfig {
    VolcengineTtsConfig::new("app-123", "secret-token", "volcano_tts")
        .with_endpoint(mock.endpoint())
        .with_timeout(Duration::from_secs(5))
}

#[derive(Default)]
struct RecordingObserver {
    transitions: Mutex<Vec<(SessionState, SessionState)>>,
    chunks: Mutex<Vec<i32>>,
}

impl SessionObserver for RecordingObserver {
    fn on_state_change(&self, from: SessionState, to: SessionState) {
        self.transitions.lock().unwrap().push((from, to));
    }

    fn on_audio_chunk(&self, sequence_number: i32, _len: usize) {
        self.chunks.lock().unwrap().push(sequence_number);
    }
}

#[tokio::test]
async fn test_streamed_chunks_are_concatenated() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![
        b"ID3-".to_vec(),
        b"frame-one-".to_vec(),
        b"frame-two".to_vec(),
    ]))
    .await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();

    let audio = tts
        .synthesize("你好，世界", &VoiceParams::default())
        .await
        .unwrap();

    assert_eq!(&audio[..], b"ID3-frame-one-frame-two");
    assert_eq!(mock.connections_opened(), 1);
    assert!(mock.wait_for_closed(1, WAIT).await);
}

#[tokio::test]
async fn test_request_envelope_and_auth_header() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![b"audio".to_vec()])).await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();
    let voice = VoiceParams::new("ICL_zh_male_cixingnansang_tob").with_speed_ratio(1.5);

    tts.synthesize("欢迎收听", &voice).await.unwrap();

    assert_eq!(mock.auth_headers(), vec!["Bearer; secret-token".to_string()]);

    let envelopes = mock.envelopes();
    assert_eq!(envelopes.len(), 1);
    let envelope = &envelopes[0];
    assert_eq!(envelope["app"]["appid"], "app-123");
    assert_eq!(envelope["app"]["token"], "access_token");
    assert_eq!(envelope["app"]["cluster"], "volcano_tts");
    assert_eq!(envelope["audio"]["voice_type"], "ICL_zh_male_cixingnansang_tob");
    assert_eq!(envelope["audio"]["encoding"], "mp3");
    assert_eq!(envelope["audio"]["speed_ratio"], 1.5);
    assert_eq!(envelope["request"]["text"], "欢迎收听");
    assert_eq!(envelope["request"]["text_type"], "plain");
    assert_eq!(envelope["request"]["operation"], "submit");
    assert!(!envelope["request"]["reqid"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_each_call_uses_fresh_request_id() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![b"a".to_vec()])).await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();

    tts.synthesize("一", &VoiceParams::default()).await.unwrap();
    tts.synthesize("二", &VoiceParams::default()).await.unwrap();

    let envelopes = mock.envelopes();
    assert_eq!(envelopes.len(), 2);
    assert_ne!(envelopes[0]["request"]["reqid"], envelopes[1]["request"]["reqid"]);
    assert_eq!(mock.connections_opened(), 2);
    assert!(mock.wait_for_closed(2, WAIT).await);
}

#[tokio::test]
async fn test_server_error_fails_session() {
    let mock = VolcengineMock::start(MockBehavior::Error {
        code: 3001,
        message: "invalid voice_type".to_string(),
    })
    .await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();

    let err = tts
        .synthesize("你好", &VoiceParams::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::Server {
            code: 3001,
            message: "invalid voice_type".to_string()
        }
    );
    assert_eq!(err.kind(), "server_error");
    assert!(mock.wait_for_closed(1, WAIT).await);
}

#[tokio::test]
async fn test_silent_server_times_out_and_connection_is_closed() {
    let mock = VolcengineMock::start(MockBehavior::Silent).await;
    let config = config_for(&mock);
    let deadline = Duration::from_millis(300);
    let session = StreamSession::new(Arc::new(config)).with_deadline(deadline);

    let started = Instant::now();
    let err = session
        .run("你好", &VoiceParams::default())
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::Timeout(deadline));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(mock.connections_opened(), 1);
    assert!(mock.wait_for_closed(1, WAIT).await);
}

#[tokio::test]
async fn test_cancellation_stops_session() {
    let mock = VolcengineMock::start(MockBehavior::Silent).await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = tts
        .synthesize_with_cancel("你好", &VoiceParams::default(), cancel)
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::Cancelled);
    assert!(mock.wait_for_closed(1, WAIT).await);
}

#[tokio::test]
async fn test_close_before_final_chunk_is_connection_error() {
    let mock = VolcengineMock::start(MockBehavior::CloseEarly).await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();

    let err = tts
        .synthesize("你好", &VoiceParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Connection(_)), "got {err:?}");
    assert_eq!(err.kind(), "connection_error");
}

#[tokio::test]
async fn test_refused_connection_is_connection_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = VolcengineTtsConfig::new("app-123", "secret-token", "volcano_tts")
        .with_endpoint(format!("ws://{addr}/api/v1/tts/ws_binary"));
    let tts = VolcengineTts::new(config).unwrap();

    let err = tts
        .synthesize("你好", &VoiceParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Connection(_)), "got {err:?}");
}

#[tokio::test]
async fn test_observer_sees_full_lifecycle() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![
        b"one".to_vec(),
        b"two".to_vec(),
    ]))
    .await;
    let observer = Arc::new(RecordingObserver::default());
    let tts = VolcengineTts::new(config_for(&mock))
        .unwrap()
        .with_observer(observer.clone());

    tts.synthesize("你好", &VoiceParams::default()).await.unwrap();

    assert_eq!(
        *observer.transitions.lock().unwrap(),
        vec![
            (SessionState::Idle, SessionState::Connecting),
            (SessionState::Connecting, SessionState::AwaitingFirstResponse),
            (SessionState::AwaitingFirstResponse, SessionState::StreamingAudio),
            (SessionState::StreamingAudio, SessionState::Completed),
        ]
    );
    assert_eq!(*observer.chunks.lock().unwrap(), vec![1, -2]);
}

#[tokio::test]
async fn test_connection_check_reports_audio_size() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![vec![0u8; 128]])).await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();

    let check = tts
        .check_connection(&VoiceParams::default())
        .await
        .unwrap();

    assert_eq!(check.audio_bytes, 128);
    assert_eq!(mock.envelopes()[0]["request"]["text"], "这是连接测试");
}

#[tokio::test]
async fn test_connection_check_fails_on_empty_audio() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![Vec::new()])).await;
    let tts = VolcengineTts::new(config_for(&mock)).unwrap();

    let err = tts
        .check_connection(&VoiceParams::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::Connection("connection check returned no audio".to_string())
    );
}

#[tokio::test]
async fn test_unbounded_deadline_does_not_overflow() {
    let mock = VolcengineMock::start(MockBehavior::Stream(vec![b"audio".to_vec()])).await;
    let session = StreamSession::new(Arc::new(config_for(&mock))).with_deadline(Duration::MAX);

    let audio = session.run("你好", &VoiceParams::default()).await.unwrap();

    assert_eq!(&audio[..], b"audio");
}
