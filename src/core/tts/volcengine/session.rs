//! Streaming session for one Volcengine synthesis request.
//!
//! A session owns exactly one WebSocket connection for its whole lifetime:
//!
//! ```text
//! Idle ──▶ Connecting ──▶ AwaitingFirstResponse ──▶ StreamingAudio ──▶ Completed
//!   │          │                  │                       │
//!   └──────────┴──────────────────┴───────────────────────┴──────────▶ Failed
//! ```
//!
//! The protocol logic lives in [`SessionMachine`], which is fed decoded frames
//! and never touches the network. [`StreamSession`] drives the machine from a
//! single receive loop, races it against the deadline and the cancellation
//! token, and closes the connection on every exit path.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::codec::{EncodeError, ProtocolError, ResponseMessage, decode_response, encode_request};
use super::config::VolcengineTtsConfig;
use super::messages::{RequestEnvelope, VoiceParams};
use super::{CLOSE_TIMEOUT, DEFAULT_HEADER};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stand-in expiry for deadlines too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365);

// =============================================================================
// Errors
// =============================================================================

/// Terminal failure of a session. No variant carries partial audio.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server error {code}: {message}")]
    Server { code: u32, message: String },

    #[error("Session timed out after {0:?}")]
    Timeout(Duration),

    #[error("Session cancelled")]
    Cancelled,

    #[error("Failed to encode request: {0}")]
    Encode(String),
}

impl From<EncodeError> for SessionError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err.to_string())
    }
}

impl SessionError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection_error",
            Self::Protocol(ProtocolError::DecompressFailed(_)) => "decompress_failed",
            Self::Protocol(_) => "protocol_error",
            Self::Server { .. } => "server_error",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Encode(_) => "encode_error",
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    AwaitingFirstResponse,
    StreamingAudio,
    Completed,
    Failed,
}

impl SessionState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::AwaitingFirstResponse => "awaiting_first_response",
            Self::StreamingAudio => "streaming_audio",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives progress notifications from a session.
///
/// Callbacks run inline on the receive loop and must not block.
pub trait SessionObserver: Send + Sync {
    fn on_state_change(&self, _from: SessionState, _to: SessionState) {}

    fn on_audio_chunk(&self, _sequence_number: i32, _len: usize) {}

    fn on_frontend_message(&self, _text: &str) {}
}

// =============================================================================
// Session Machine
// =============================================================================

/// Outcome of feeding one frame to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep waiting for frames.
    Continue,
    /// Terminal audio chunk received; carries the whole accumulated stream.
    Completed(Bytes),
    /// Terminal failure.
    Failed(SessionError),
    /// Frame arrived after the session already ended and was dropped.
    Discarded,
}

/// Pure protocol state machine of one session.
///
/// Audio is accumulated in arrival order; the terminal chunk's data is part of
/// the result.
#[derive(Default)]
pub struct SessionMachine {
    state: SessionState,
    audio: BytesMut,
    chunk_count: usize,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Option<Arc<dyn SessionObserver>>) -> Self {
        Self {
            observer,
            ..Self::default()
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Bytes accumulated so far.
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.audio.len()
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!("Volcengine TTS session state: {} -> {}", from, to);
        self.state = to;
        if let Some(observer) = &self.observer {
            observer.on_state_change(from, to);
        }
    }

    /// `Idle -> Connecting`.
    pub fn begin_connect(&mut self) {
        if self.state == SessionState::Idle {
            self.transition(SessionState::Connecting);
        }
    }

    /// `Connecting -> AwaitingFirstResponse`, once the request frame is sent.
    pub fn request_sent(&mut self) {
        if self.state == SessionState::Connecting {
            self.transition(SessionState::AwaitingFirstResponse);
        }
    }

    /// Move to `Failed` and hand the error back. A no-op once terminal.
    pub fn fail(&mut self, err: SessionError) -> SessionError {
        if !self.state.is_terminal() {
            self.audio.clear();
            self.transition(SessionState::Failed);
        }
        err
    }

    /// Decode a raw binary frame and feed it to the machine.
    pub fn on_frame(&mut self, frame: Bytes) -> Step {
        if self.state.is_terminal() {
            debug!(
                "Discarding {} byte frame received after session ended",
                frame.len()
            );
            return Step::Discarded;
        }

        match decode_response(frame) {
            Ok(message) => self.on_message(message),
            Err(e) => Step::Failed(self.fail(SessionError::Protocol(e))),
        }
    }

    /// Feed a decoded message to the machine.
    pub fn on_message(&mut self, message: ResponseMessage) -> Step {
        if self.state.is_terminal() {
            return Step::Discarded;
        }

        match message {
            ResponseMessage::Ack => {
                debug!("Received Volcengine TTS ack");
                self.transition(SessionState::StreamingAudio);
                Step::Continue
            }
            ResponseMessage::Frontend { text } => {
                debug!("Received Volcengine TTS frontend message: {}", text);
                self.transition(SessionState::StreamingAudio);
                if let Some(observer) = &self.observer {
                    observer.on_frontend_message(&text);
                }
                Step::Continue
            }
            ResponseMessage::Unrecognized { raw_type } => {
                warn!(
                    "Ignoring unrecognized Volcengine TTS message type {:#x}",
                    raw_type
                );
                self.transition(SessionState::StreamingAudio);
                Step::Continue
            }
            ResponseMessage::AudioChunk {
                sequence_number,
                declared_size,
                data,
            } => {
                self.transition(SessionState::StreamingAudio);
                self.chunk_count += 1;
                debug!(
                    "Received audio chunk: {} bytes (sequence: {}, declared: {})",
                    data.len(),
                    sequence_number,
                    declared_size
                );
                if let Some(observer) = &self.observer {
                    observer.on_audio_chunk(sequence_number, data.len());
                }
                self.audio.extend_from_slice(&data);

                if sequence_number < 0 {
                    let audio = self.audio.split().freeze();
                    self.transition(SessionState::Completed);
                    Step::Completed(audio)
                } else {
                    Step::Continue
                }
            }
            ResponseMessage::Error { code, message } => {
                error!("Volcengine TTS server error [{}]: {}", code, message);
                Step::Failed(self.fail(SessionError::Server { code, message }))
            }
        }
    }
}

// =============================================================================
// Stream Session
// =============================================================================

/// One synthesis request over one WebSocket connection.
///
/// Sessions are single-use: [`StreamSession::run`] consumes the session.
pub struct StreamSession {
    config: Arc<VolcengineTtsConfig>,
    deadline: Duration,
    cancel: CancellationToken,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl StreamSession {
    pub fn new(config: Arc<VolcengineTtsConfig>) -> Self {
        let deadline = config.timeout;
        Self {
            config,
            deadline,
            cancel: CancellationToken::new(),
            observer: None,
        }
    }

    /// Override the deadline taken from the config.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Cancel the session when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Synthesize `text`, returning the concatenated audio stream.
    ///
    /// Exactly one connection is opened (unless opening itself fails) and it is
    /// closed before this returns, whatever the outcome.
    pub async fn run(self, text: &str, voice: &VoiceParams) -> Result<Bytes, SessionError> {
        let Self {
            config,
            deadline,
            cancel,
            observer,
        } = self;

        let mut machine = SessionMachine::with_observer(observer);
        let now = Instant::now();
        let expires_at = now.checked_add(deadline).unwrap_or_else(|| now + FAR_FUTURE);

        let envelope = RequestEnvelope::build(&config, text, voice);
        let request_id = envelope.request_id().to_string();
        let frame = match encode_request(&envelope, DEFAULT_HEADER) {
            Ok(frame) => frame,
            Err(e) => return Err(machine.fail(e.into())),
        };

        machine.begin_connect();
        debug!(
            "Connecting to Volcengine TTS at {} (reqid: {})",
            config.endpoint, request_id
        );

        let mut ws = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Volcengine TTS session cancelled while connecting (reqid: {})", request_id);
                return Err(machine.fail(SessionError::Cancelled));
            }
            _ = sleep_until(expires_at) => {
                error!("Volcengine TTS connection timed out after {:?} (reqid: {})", deadline, request_id);
                return Err(machine.fail(SessionError::Timeout(deadline)));
            }
            result = open_connection(&config) => match result {
                Ok(ws) => ws,
                Err(e) => {
                    error!("{} (reqid: {})", e, request_id);
                    return Err(machine.fail(e));
                }
            },
        };

        info!(
            "Connected to Volcengine TTS WebSocket (reqid: {}, {} chars)",
            request_id,
            text.chars().count()
        );

        let outcome = exchange(&mut ws, frame, &mut machine, expires_at, deadline, &cancel).await;
        close_connection(ws, &request_id).await;

        match &outcome {
            Ok(audio) => info!(
                "Volcengine TTS synthesis complete: {} bytes in {} chunks (reqid: {})",
                audio.len(),
                machine.chunk_count(),
                request_id
            ),
            Err(e) => error!("Volcengine TTS session failed (reqid: {}): {}", request_id, e),
        }

        outcome
    }
}

/// Open the WebSocket with the vendor authorization header.
async fn open_connection(config: &VolcengineTtsConfig) -> Result<WsStream, SessionError> {
    let mut request = config.endpoint.as_str().into_client_request().map_err(|e| {
        SessionError::Connection(format!("Failed to create WebSocket request: {e}"))
    })?;

    let auth = HeaderValue::from_str(&config.authorization_header())
        .map_err(|e| SessionError::Connection(format!("Invalid authorization header: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, auth);

    let (ws, response) = connect_async(request).await.map_err(|e| {
        SessionError::Connection(format!("Failed to connect to Volcengine TTS: {e}"))
    })?;
    debug!("WebSocket handshake completed with status {}", response.status());

    Ok(ws)
}

/// Send the request frame, then pump inbound frames through the machine.
async fn exchange(
    ws: &mut WsStream,
    frame: Bytes,
    machine: &mut SessionMachine,
    expires_at: Instant,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Bytes, SessionError> {
    let frame_len = frame.len();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(machine.fail(SessionError::Cancelled)),
        _ = sleep_until(expires_at) => return Err(machine.fail(SessionError::Timeout(deadline))),
        sent = ws.send(Message::Binary(frame)) => {
            if let Err(e) = sent {
                return Err(machine.fail(SessionError::Connection(format!(
                    "Failed to send TTS request: {e}"
                ))));
            }
        }
    }
    debug!("Sent {} byte TTS request frame", frame_len);
    machine.request_sent();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Volcengine TTS session cancelled");
                return Err(machine.fail(SessionError::Cancelled));
            }
            _ = sleep_until(expires_at) => {
                return Err(machine.fail(SessionError::Timeout(deadline)));
            }
            next = ws.next() => next,
        };

        match next {
            Some(Ok(Message::Binary(data))) => match machine.on_frame(data) {
                Step::Continue | Step::Discarded => {}
                Step::Completed(audio) => return Ok(audio),
                Step::Failed(e) => return Err(e),
            },
            Some(Ok(Message::Text(text))) => {
                debug!("Ignoring unexpected text message from Volcengine TTS: {}", text);
            }
            Some(Ok(Message::Close(close_frame))) => {
                return Err(machine.fail(SessionError::Connection(format!(
                    "Connection closed before final audio chunk: {close_frame:?}"
                ))));
            }
            Some(Ok(_)) => {
                // Ping/pong are answered by tungstenite itself.
            }
            Some(Err(e)) => {
                return Err(machine.fail(SessionError::Connection(format!(
                    "WebSocket error: {e}"
                ))));
            }
            None => {
                return Err(machine.fail(SessionError::Connection(
                    "WebSocket stream ended before final audio chunk".to_string(),
                )));
            }
        }
    }
}

/// Close the connection, bounded by [`CLOSE_TIMEOUT`]. The socket is dropped either way.
async fn close_connection(mut ws: WsStream, request_id: &str) {
    match timeout(CLOSE_TIMEOUT, ws.close(None)).await {
        Ok(Ok(())) => debug!("Volcengine TTS connection closed (reqid: {})", request_id),
        Ok(Err(e)) => debug!(
            "Volcengine TTS connection already closed (reqid: {}): {}",
            request_id, e
        ),
        Err(_) => warn!(
            "Timed out closing Volcengine TTS connection (reqid: {})",
            request_id
        ),
    }
}
