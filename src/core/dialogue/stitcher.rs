//! Sequential synthesis of dialogue segments.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tracing::{debug, error, info};

use super::script::ScriptSegment;
use crate::core::tts::base::Synthesizer;
use crate::core::tts::volcengine::{SessionError, VoiceParams};

/// Failure of one segment of a dialogue. No partial audio is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StitchError {
    #[error("Segment {index} failed: {cause}")]
    Segment { index: usize, cause: SessionError },

    #[error("Segment {index} has no voice configured for speaker '{speaker}'")]
    UnknownSpeaker { index: usize, speaker: String },
}

impl StitchError {
    /// Index of the failing segment.
    pub fn index(&self) -> usize {
        match self {
            Self::Segment { index, .. } | Self::UnknownSpeaker { index, .. } => *index,
        }
    }

    /// Session error behind a segment failure, if any.
    pub fn cause(&self) -> Option<&SessionError> {
        match self {
            Self::Segment { cause, .. } => Some(cause),
            Self::UnknownSpeaker { .. } => None,
        }
    }
}

/// Synthesizes segments strictly one at a time and concatenates the audio.
///
/// Segment `i + 1` is only started after segment `i` produced its audio; the
/// first failure aborts the run.
pub struct DialogueStitcher<S> {
    synthesizer: S,
}

impl<S: Synthesizer> DialogueStitcher<S> {
    pub fn new(synthesizer: S) -> Self {
        Self { synthesizer }
    }

    pub async fn run(
        &self,
        segments: &[ScriptSegment],
        voices: &HashMap<String, VoiceParams>,
    ) -> Result<Bytes, StitchError> {
        info!("Synthesizing dialogue of {} segments", segments.len());

        let mut parts: Vec<Bytes> = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let audio = self.synthesize_segment(index, segment, voices).await?;
            parts.push(audio);
        }

        let total: usize = parts.iter().map(Bytes::len).sum();
        let mut audio = BytesMut::with_capacity(total);
        for part in &parts {
            audio.extend_from_slice(part);
        }

        info!(
            "Dialogue synthesis complete: {} segments, {} bytes",
            parts.len(),
            total
        );
        Ok(audio.freeze())
    }

    async fn synthesize_segment(
        &self,
        index: usize,
        segment: &ScriptSegment,
        voices: &HashMap<String, VoiceParams>,
    ) -> Result<Bytes, StitchError> {
        let voice = voices
            .get(&segment.speaker_id)
            .ok_or_else(|| StitchError::UnknownSpeaker {
                index,
                speaker: segment.speaker_id.clone(),
            })?;

        debug!(
            "Synthesizing segment {} ({}, voice {}): {} chars",
            index,
            segment.speaker_id,
            voice.voice_type,
            segment.text.chars().count()
        );

        self.synthesizer
            .synthesize(&segment.text, voice)
            .await
            .map_err(|cause| {
                error!("Dialogue segment {} failed: {}", index, cause);
                StitchError::Segment { index, cause }
            })
    }
}
