//! WebSocket mock of the Volcengine binary TTS endpoint.
//!
//! Every accepted connection takes the next scripted [`MockBehavior`] (or the
//! default one once the script is exhausted). The server records the
//! `Authorization` header, the decoded request envelope and whether the
//! client closed the connection.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// What the mock does with one connection after reading the request frame.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Ack, then send each chunk; the last one carries a negative sequence number.
    Stream(Vec<Vec<u8>>),
    /// Send a gzip-compressed error frame.
    Error { code: u32, message: String },
    /// Never answer.
    Silent,
    /// Send one non-terminal chunk, then close the connection.
    CloseEarly,
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<MockBehavior>>,
    fallback: Mutex<Option<MockBehavior>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    auth_headers: Mutex<Vec<String>>,
    envelopes: Mutex<Vec<Value>>,
}

impl MockState {
    fn next_behavior(&self) -> MockBehavior {
        if let Some(behavior) = self.script.lock().unwrap().pop_front() {
            return behavior;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(MockBehavior::Silent)
    }
}

/// Running mock server. The accept loop is aborted on drop.
pub struct VolcengineMock {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl VolcengineMock {
    /// Start a mock that applies `behavior` to every connection.
    pub async fn start(behavior: MockBehavior) -> Self {
        let mock = Self::start_scripted(Vec::new()).await;
        *mock.state.fallback.lock().unwrap() = Some(behavior);
        mock
    }

    /// Start a mock that applies `script[i]` to the i-th connection.
    pub async fn start_scripted(script: Vec<MockBehavior>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState {
            script: Mutex::new(script.into()),
            ..MockState::default()
        });

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state).await;
                });
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Endpoint URL to put in the client config.
    pub fn endpoint(&self) -> String {
        format!("ws://{}/api/v1/tts/ws_binary", self.addr)
    }

    pub fn connections_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn connections_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.state.auth_headers.lock().unwrap().clone()
    }

    /// Decoded JSON envelopes, one per received request frame.
    pub fn envelopes(&self) -> Vec<Value> {
        self.state.envelopes.lock().unwrap().clone()
    }

    /// Wait until `expected` connections have been closed by the client.
    ///
    /// Returns `false` if that does not happen within `within`.
    pub async fn wait_for_closed(&self, expected: usize, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if self.connections_closed() >= expected {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for VolcengineMock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<MockState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let header_state = state.clone();
    let callback = move |request: &Request, response: Response| {
        let auth = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        header_state.auth_headers.lock().unwrap().push(auth);
        Ok::<_, ErrorResponse>(response)
    };

    let ws_stream = accept_hdr_async(stream, callback).await?;
    state.opened.fetch_add(1, Ordering::SeqCst);
    let (mut write, mut read) = ws_stream.split();
    let behavior = state.next_behavior();

    // Request frame
    let mut request_seen = false;
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Binary(frame)) => {
                if let Some(envelope) = decode_request(&frame) {
                    state.envelopes.lock().unwrap().push(envelope);
                }
                request_seen = true;
                break;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    if request_seen {
        match behavior {
            MockBehavior::Stream(chunks) => {
                write.send(Message::Binary(ack_frame())).await?;
                let count = chunks.len() as i32;
                for (i, chunk) in chunks.iter().enumerate() {
                    let index = i as i32 + 1;
                    let sequence = if index == count { -index } else { index };
                    write
                        .send(Message::Binary(audio_frame(sequence, chunk)))
                        .await?;
                }
            }
            MockBehavior::Error { code, message } => {
                write
                    .send(Message::Binary(error_frame(code, &message)))
                    .await?;
            }
            MockBehavior::Silent => {}
            MockBehavior::CloseEarly => {
                write
                    .send(Message::Binary(audio_frame(1, b"partial")))
                    .await?;
                write.send(Message::Close(None)).await?;
            }
        }
    }

    // Drain until the client closes or drops the connection.
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    state.closed.fetch_add(1, Ordering::SeqCst);

    Ok(())
}

// =============================================================================
// Frame Helpers
// =============================================================================

fn decode_request(frame: &[u8]) -> Option<Value> {
    if frame.len() < 8 {
        return None;
    }
    let mut json = String::new();
    GzDecoder::new(&frame[8..]).read_to_string(&mut json).ok()?;
    serde_json::from_str(&json).ok()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn ack_frame() -> Bytes {
    Bytes::from_static(&[0x11, 0xB0, 0x10, 0x00])
}

pub fn audio_frame(sequence_number: i32, data: &[u8]) -> Bytes {
    let mut frame = BytesMut::new();
    frame.put_slice(&[0x11, 0xB1, 0x10, 0x00]);
    frame.put_i32(sequence_number);
    frame.put_u32(data.len() as u32);
    frame.put_slice(data);
    frame.freeze()
}

pub fn error_frame(code: u32, message: &str) -> Bytes {
    let compressed = gzip(message.as_bytes());
    let mut frame = BytesMut::new();
    frame.put_slice(&[0x11, 0xF0, 0x11, 0x00]);
    frame.put_u32(code);
    frame.put_u32(compressed.len() as u32);
    frame.put_slice(&compressed);
    frame.freeze()
}
