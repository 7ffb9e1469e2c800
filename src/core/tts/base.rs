//! Shared TTS abstractions.
//!
//! [`Synthesizer`] is the seam between orchestration code (dialogue stitching,
//! HTTP handlers, the CLI) and a concrete streaming provider.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use super::volcengine::{SessionError, VoiceParams};

/// Configuration and validation errors raised before any connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TTSError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Turns one piece of text into one complete audio buffer.
///
/// Implementations open a fresh session per call and must not share mutable
/// state between concurrent calls.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Bytes, SessionError>;
}

#[async_trait]
impl<S: Synthesizer + ?Sized> Synthesizer for Arc<S> {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Bytes, SessionError> {
        (**self).synthesize(text, voice).await
    }
}

#[async_trait]
impl<S: Synthesizer + ?Sized> Synthesizer for &S {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Bytes, SessionError> {
        (**self).synthesize(text, voice).await
    }
}
