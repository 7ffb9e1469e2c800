//! Volcengine TTS provider.
//!
//! [`VolcengineTts`] is a cheap-to-clone handle holding the validated
//! configuration. Every synthesis call runs in its own [`StreamSession`] on its
//! own connection, so concurrent calls never share protocol state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::VolcengineTtsConfig;
use super::messages::VoiceParams;
use super::session::{SessionError, SessionObserver, StreamSession};
use super::voices::{VoiceInfo, available_voices};
use super::CONNECTION_CHECK_TEXT;
use crate::core::dialogue::{DialogueStitcher, ScriptSegment, StitchError};
use crate::core::tts::base::{Synthesizer, TTSResult};

/// Result of [`VolcengineTts::check_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCheck {
    /// Size of the test audio returned by the service.
    pub audio_bytes: usize,
}

#[derive(Clone)]
pub struct VolcengineTts {
    config: Arc<VolcengineTtsConfig>,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl VolcengineTts {
    /// Validate `config` and create a provider.
    pub fn new(config: VolcengineTtsConfig) -> TTSResult<Self> {
        config.validate()?;
        info!(
            "Volcengine TTS provider ready (cluster: {}, endpoint: {})",
            config.cluster, config.endpoint
        );
        Ok(Self {
            config: Arc::new(config),
            observer: None,
        })
    }

    /// Attach an observer to every session this provider starts.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &VolcengineTtsConfig {
        &self.config
    }

    /// New single-use session bound to this provider's configuration.
    pub fn session(&self) -> StreamSession {
        let session = StreamSession::new(Arc::clone(&self.config));
        match &self.observer {
            Some(observer) => session.with_observer(Arc::clone(observer)),
            None => session,
        }
    }

    /// Synthesize `text` with `voice`, returning the complete audio stream.
    pub async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Bytes, SessionError> {
        self.session().run(text, voice).await
    }

    /// Like [`Self::synthesize`], aborting when `cancel` fires.
    pub async fn synthesize_with_cancel(
        &self,
        text: &str,
        voice: &VoiceParams,
        cancel: CancellationToken,
    ) -> Result<Bytes, SessionError> {
        self.session()
            .with_cancellation(cancel)
            .run(text, voice)
            .await
    }

    /// Synthesize a dialogue script segment by segment, concatenating the audio.
    ///
    /// Stops at the first failing segment.
    pub async fn synthesize_sequence(
        &self,
        segments: &[ScriptSegment],
        voices: &HashMap<String, VoiceParams>,
    ) -> Result<Bytes, StitchError> {
        DialogueStitcher::new(self).run(segments, voices).await
    }

    /// Synthesize a short fixed phrase to verify credentials and reachability.
    ///
    /// The check only passes when the service returns some audio.
    pub async fn check_connection(&self, voice: &VoiceParams) -> Result<ConnectionCheck, SessionError> {
        match self.synthesize(CONNECTION_CHECK_TEXT, voice).await {
            Ok(audio) if audio.is_empty() => {
                warn!("Volcengine TTS connection check returned no audio");
                Err(SessionError::Connection(
                    "connection check returned no audio".to_string(),
                ))
            }
            Ok(audio) => {
                info!("Volcengine TTS connection check passed ({} bytes)", audio.len());
                Ok(ConnectionCheck {
                    audio_bytes: audio.len(),
                })
            }
            Err(e) => {
                warn!("Volcengine TTS connection check failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn available_voices(&self) -> Vec<VoiceInfo> {
        available_voices()
    }
}

#[async_trait]
impl Synthesizer for VolcengineTts {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Bytes, SessionError> {
        VolcengineTts::synthesize(self, text, voice).await
    }
}
