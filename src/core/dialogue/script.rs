//! Dialogue script parsing.

use serde::{Deserialize, Serialize};

use crate::core::tts::base::TTSError;

/// Speaker id of the first host.
pub const HOST_A: &str = "hostA";

/// Speaker id of the second host.
pub const HOST_B: &str = "hostB";

/// One speaker turn of a dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub speaker_id: String,
    pub text: String,
}

impl ScriptSegment {
    pub fn new(speaker_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            text: text.into(),
        }
    }
}

/// Line prefix identifying a speaker, e.g. `主持人A` for `hostA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerMarker {
    pub marker: String,
    pub speaker_id: String,
}

impl SpeakerMarker {
    pub fn new(marker: impl Into<String>, speaker_id: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            speaker_id: speaker_id.into(),
        }
    }
}

/// Splits a script into speaker segments by line-prefix markers.
///
/// A marker must start the (trimmed) line and be followed by `:` or `：`.
/// Lines without a known marker are ignored, as are markers with no content.
#[derive(Debug, Clone)]
pub struct ScriptParser {
    markers: Vec<SpeakerMarker>,
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::new_unchecked(vec![
            SpeakerMarker::new("主持人A", HOST_A),
            SpeakerMarker::new("主持人B", HOST_B),
        ])
    }
}

impl ScriptParser {
    /// Parser with custom markers.
    pub fn with_markers(markers: Vec<SpeakerMarker>) -> Result<Self, TTSError> {
        if markers.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "at least one speaker marker is required".to_string(),
            ));
        }
        if let Some(m) = markers.iter().find(|m| m.marker.trim().is_empty()) {
            return Err(TTSError::InvalidConfiguration(format!(
                "empty marker for speaker {}",
                m.speaker_id
            )));
        }
        Ok(Self::new_unchecked(markers))
    }

    fn new_unchecked(mut markers: Vec<SpeakerMarker>) -> Self {
        // Longest first so `主持人AB` wins over `主持人A`.
        markers.sort_by_key(|m| std::cmp::Reverse(m.marker.len()));
        Self { markers }
    }

    pub fn markers(&self) -> &[SpeakerMarker] {
        &self.markers
    }

    /// Parse `script` into ordered segments.
    pub fn parse(&self, script: &str) -> Vec<ScriptSegment> {
        script
            .lines()
            .filter_map(|line| self.parse_line(line.trim()))
            .collect()
    }

    fn parse_line(&self, line: &str) -> Option<ScriptSegment> {
        if line.is_empty() {
            return None;
        }
        self.markers.iter().find_map(|m| {
            let rest = line.strip_prefix(m.marker.as_str())?;
            let text = rest
                .strip_prefix(':')
                .or_else(|| rest.strip_prefix('：'))?
                .trim();
            (!text.is_empty()).then(|| ScriptSegment::new(m.speaker_id.clone(), text))
        })
    }
}

/// Parse `script` with the default `主持人A` / `主持人B` markers.
pub fn parse_dialogue_script(script: &str) -> Vec<ScriptSegment> {
    ScriptParser::default().parse(script)
}
