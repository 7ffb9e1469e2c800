//! Volcengine (ByteDance OpenSpeech) TTS provider.
//!
//! This module integrates the Volcengine text-to-speech service over its
//! binary WebSocket protocol (`/api/v1/tts/ws_binary`).
//!
//! # Protocol
//!
//! Every frame starts with a 4-byte nibble-packed header:
//!
//! ```text
//! byte0: version << 4 | header size (in 4-byte words)
//! byte1: message type << 4 | message flags
//! byte2: serialization << 4 | compression
//! byte3: reserved
//! ```
//!
//! A synthesis request is one full-client-request frame carrying a
//! gzip-compressed JSON envelope. The server answers with a stream of
//! audio-only frames (terminated by a negative sequence number), optional
//! frontend text frames, or a single error frame.
//!
//! # Example
//!
//! ```rust,ignore
//! use podcast_gateway::core::tts::volcengine::{VolcengineTts, VolcengineTtsConfig, VoiceParams};
//!
//! let config = VolcengineTtsConfig::new("app-id", "access-token", "volcano_tts");
//! let tts = VolcengineTts::new(config)?;
//! let audio = tts.synthesize("你好，世界", &VoiceParams::default()).await?;
//! ```
//!
//! # Authentication
//!
//! The access token travels in the `Authorization` header as `Bearer; <token>`
//! (note the semicolon). The service rejects the standard `Bearer <token>` form.

pub mod codec;
pub mod config;
pub mod messages;
pub mod provider;
pub mod session;
pub mod voices;


pub use codec::{
    EncodeError, FrameHeader, ProtocolError, ResponseMessage, decode_response, encode_request,
};
pub use config::VolcengineTtsConfig;
pub use messages::{AudioEncoding, RequestEnvelope, VoiceParams};
pub use provider::VolcengineTts;
pub use session::{
    SessionError, SessionMachine, SessionObserver, SessionState, Step, StreamSession,
};
pub use voices::{VoiceInfo, available_voices};

use std::time::Duration;

// =============================================================================
// API Constants
// =============================================================================

/// Binary-protocol WebSocket endpoint.
pub const VOLCENGINE_TTS_URL: &str = "wss://openspeech.bytedance.com/api/v1/tts/ws_binary";

/// Header bytes of every outbound request frame.
///
/// version 1, header size 1 word, full client request, no flags,
/// JSON serialization, gzip compression, reserved 0.
pub const DEFAULT_HEADER: [u8; 4] = [0x11, 0x10, 0x11, 0x00];

// =============================================================================
// Limits and Defaults
// =============================================================================

/// Default session deadline, measured from the start of the session.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest accepted session deadline.
pub const MAX_SESSION_TIMEOUT: Duration = Duration::from_secs(600);

/// Upper bound on the close handshake so a dead peer cannot stall a session exit.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default voice, the one the account is provisioned with.
pub const DEFAULT_VOICE_TYPE: &str = "zh_female_linjia_mars_bigtts";

/// Default cluster for the standard TTS product.
pub const DEFAULT_CLUSTER: &str = "volcano_tts";

/// User id sent in every envelope.
pub const DEFAULT_UID: &str = "388808087185088";

/// Placeholder carried in the envelope's `app.token`; the real token goes in the header.
pub const ENVELOPE_TOKEN: &str = "access_token";

/// Text type of the request (`plain` or `ssml`).
pub const DEFAULT_TEXT_TYPE: &str = "plain";

/// Operation of the request (`submit` streams audio back).
pub const DEFAULT_OPERATION: &str = "submit";

/// Text used by the connection check.
pub const CONNECTION_CHECK_TEXT: &str = "这是连接测试";

/// Minimum speed ratio accepted by the service.
pub const MIN_SPEED_RATIO: f32 = 0.2;

/// Maximum speed ratio accepted by the service.
pub const MAX_SPEED_RATIO: f32 = 3.0;

/// Minimum volume ratio accepted by the service.
pub const MIN_VOLUME_RATIO: f32 = 0.1;

/// Maximum volume ratio accepted by the service.
pub const MAX_VOLUME_RATIO: f32 = 3.0;

/// Minimum pitch ratio accepted by the service.
pub const MIN_PITCH_RATIO: f32 = 0.1;

/// Maximum pitch ratio accepted by the service.
pub const MAX_PITCH_RATIO: f32 = 3.0;
