//! Binary frame codec for the Volcengine TTS WebSocket protocol.
//!
//! Pure encode/decode functions: no connection state and no I/O. The decoder
//! turns one complete WebSocket binary message into a [`ResponseMessage`],
//! independent of which transport delivered it.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

use super::messages::RequestEnvelope;

// =============================================================================
// Header Field Values
// =============================================================================

/// Message types carried in the high nibble of header byte 1.
pub mod message_type {
    /// Client request carrying the full JSON envelope.
    pub const FULL_CLIENT_REQUEST: u8 = 0x1;
    /// Audio-only server response (ack or audio chunk).
    pub const AUDIO_ONLY_RESPONSE: u8 = 0xB;
    /// Frontend server response (auxiliary text).
    pub const FRONTEND_RESPONSE: u8 = 0xC;
    /// Error message from the server.
    pub const ERROR: u8 = 0xF;
}

/// Serialization methods carried in the high nibble of header byte 2.
pub mod serialization {
    pub const JSON: u8 = 0x1;
}

/// Compression methods carried in the low nibble of header byte 2.
pub mod compression {
    pub const GZIP: u8 = 0x1;
}

/// Size of the fixed part of every header.
pub const FIXED_HEADER_LEN: usize = 4;

/// Size of the big-endian length prefix that follows a request header.
const PAYLOAD_SIZE_LEN: usize = 4;

/// Sequence number + declared size prefix of an audio chunk.
const AUDIO_PREFIX_LEN: usize = 8;

/// Error code + message size prefix of an error frame.
const ERROR_PREFIX_LEN: usize = 8;

/// Message size prefix of a frontend frame.
const FRONTEND_PREFIX_LEN: usize = 4;

// =============================================================================
// Errors
// =============================================================================

/// Malformed or truncated inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("frame too short: {len} bytes, need at least 4")]
    TooShort { len: usize },

    #[error("header declares {declared} bytes but frame has only {actual}")]
    TruncatedHeader { declared: usize, actual: usize },

    #[error("header size must be at least one word")]
    InvalidHeaderSize,

    #[error("audio payload too short for sequence header: {actual} bytes")]
    TruncatedAudioHeader { actual: usize },

    #[error("payload of message type {message_type:#x} too short: {actual} bytes, need {expected}")]
    TruncatedPayload {
        message_type: u8,
        expected: usize,
        actual: usize,
    },

    #[error("failed to decompress payload: {0}")]
    DecompressFailed(String),
}

/// Failure to build an outbound request frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to serialize request envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to compress request envelope: {0}")]
    Compress(#[from] std::io::Error),

    #[error("compressed payload of {0} bytes exceeds the 32-bit length prefix")]
    PayloadTooLarge(usize),
}

// =============================================================================
// Frame Header
// =============================================================================

/// Decoded 4-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub protocol_version: u8,
    /// Header size in 4-byte words, extensions included.
    pub header_size: u8,
    pub message_type: u8,
    pub message_flags: u8,
    pub serialization: u8,
    pub compression: u8,
    pub reserved: u8,
}

impl FrameHeader {
    /// Parse the fixed header from the first four bytes of `frame`.
    pub fn parse(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < FIXED_HEADER_LEN {
            return Err(ProtocolError::TooShort { len: frame.len() });
        }

        Ok(Self {
            protocol_version: frame[0] >> 4,
            header_size: frame[0] & 0x0f,
            message_type: frame[1] >> 4,
            message_flags: frame[1] & 0x0f,
            serialization: frame[2] >> 4,
            compression: frame[2] & 0x0f,
            reserved: frame[3],
        })
    }

    /// Pack the header back into its wire form.
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            (self.protocol_version << 4) | (self.header_size & 0x0f),
            (self.message_type << 4) | (self.message_flags & 0x0f),
            (self.serialization << 4) | (self.compression & 0x0f),
            self.reserved,
        ]
    }

    /// Total header length in bytes, extensions included.
    #[inline]
    pub fn header_len(&self) -> usize {
        self.header_size as usize * 4
    }

    #[inline]
    pub fn is_gzip(&self) -> bool {
        self.compression == compression::GZIP
    }
}

// =============================================================================
// Response Message
// =============================================================================

/// One decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMessage {
    /// Audio-only response without a sequence number.
    Ack,
    /// A chunk of synthesized audio. Negative `sequence_number` marks the last one.
    AudioChunk {
        sequence_number: i32,
        declared_size: u32,
        data: Bytes,
    },
    /// Error reported by the server. Always terminal.
    Error { code: u32, message: String },
    /// Auxiliary frontend text. Never terminal.
    Frontend { text: String },
    /// Message type this client does not understand.
    Unrecognized { raw_type: u8 },
}

impl ResponseMessage {
    /// Whether this message ends the exchange.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::AudioChunk {
                sequence_number, ..
            } => *sequence_number < 0,
            Self::Error { .. } => true,
            Self::Ack | Self::Frontend { .. } | Self::Unrecognized { .. } => false,
        }
    }
}

// =============================================================================
// Encode
// =============================================================================

/// Gzip-compress `data`.
pub fn gzip_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Gunzip `data`.
pub fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ProtocolError::DecompressFailed(e.to_string()))?;
    Ok(out)
}

/// Encode a synthesis request.
///
/// Output layout: `header (4) ++ u32be(len(payload)) ++ payload`, where
/// `payload = gzip(json(envelope))`.
pub fn encode_request(envelope: &RequestEnvelope, header: [u8; 4]) -> Result<Bytes, EncodeError> {
    let json = serde_json::to_vec(envelope)?;
    let payload = gzip_compress(&json)?;
    let payload_len =
        u32::try_from(payload.len()).map_err(|_| EncodeError::PayloadTooLarge(payload.len()))?;

    let mut frame = BytesMut::with_capacity(FIXED_HEADER_LEN + PAYLOAD_SIZE_LEN + payload.len());
    frame.put_slice(&header);
    frame.put_u32(payload_len);
    frame.put_slice(&payload);
    Ok(frame.freeze())
}

// =============================================================================
// Decode
// =============================================================================

#[inline]
fn read_u32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

#[inline]
fn read_i32(buf: &[u8]) -> i32 {
    i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Decompress when the header says so, then decode text lossily.
fn decode_text(header: &FrameHeader, raw: &[u8]) -> Result<String, ProtocolError> {
    if header.is_gzip() {
        let inflated = gzip_decompress(raw)?;
        Ok(String::from_utf8_lossy(&inflated).into_owned())
    } else {
        Ok(String::from_utf8_lossy(raw).into_owned())
    }
}

/// Decode one server frame.
///
/// Audio data is sliced out of `frame` without copying.
pub fn decode_response(frame: Bytes) -> Result<ResponseMessage, ProtocolError> {
    let header = FrameHeader::parse(&frame)?;

    if header.header_size == 0 {
        return Err(ProtocolError::InvalidHeaderSize);
    }

    let header_len = header.header_len();
    if header_len > frame.len() {
        return Err(ProtocolError::TruncatedHeader {
            declared: header_len,
            actual: frame.len(),
        });
    }

    let payload = frame.slice(header_len..);

    match header.message_type {
        message_type::AUDIO_ONLY_RESPONSE => {
            if header.message_flags == 0 {
                return Ok(ResponseMessage::Ack);
            }
            if payload.len() < AUDIO_PREFIX_LEN {
                return Err(ProtocolError::TruncatedAudioHeader {
                    actual: payload.len(),
                });
            }
            Ok(ResponseMessage::AudioChunk {
                sequence_number: read_i32(&payload[0..4]),
                declared_size: read_u32(&payload[4..8]),
                data: payload.slice(AUDIO_PREFIX_LEN..),
            })
        }
        message_type::ERROR => {
            if payload.len() < ERROR_PREFIX_LEN {
                return Err(ProtocolError::TruncatedPayload {
                    message_type: header.message_type,
                    expected: ERROR_PREFIX_LEN,
                    actual: payload.len(),
                });
            }
            let code = read_u32(&payload[0..4]);
            let message = decode_text(&header, &payload[ERROR_PREFIX_LEN..])?;
            Ok(ResponseMessage::Error { code, message })
        }
        message_type::FRONTEND_RESPONSE => {
            if payload.len() < FRONTEND_PREFIX_LEN {
                return Err(ProtocolError::TruncatedPayload {
                    message_type: header.message_type,
                    expected: FRONTEND_PREFIX_LEN,
                    actual: payload.len(),
                });
            }
            let text = decode_text(&header, &payload[FRONTEND_PREFIX_LEN..])?;
            Ok(ResponseMessage::Frontend { text })
        }
        other => Ok(ResponseMessage::Unrecognized { raw_type: other }),
    }
}
