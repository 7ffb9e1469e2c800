//! Voices available to the configured Volcengine account.

use serde::{Deserialize, Serialize};

/// Voice catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Voice type sent as `audio.voice_type`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// BCP-47 language tag.
    pub language: String,
    /// Product line of the voice (`bigtts`, `icl`).
    #[serde(rename = "type")]
    pub category: String,
}

impl VoiceInfo {
    fn new(id: &str, name: &str, language: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            category: category.to_string(),
        }
    }
}

/// Voices the account is provisioned with.
///
/// The service has no listing endpoint for the binary protocol, so the catalog
/// is static.
pub fn available_voices() -> Vec<VoiceInfo> {
    vec![
        VoiceInfo::new("zh_female_linjia_mars_bigtts", "林佳女声", "zh-CN", "bigtts"),
        VoiceInfo::new("ICL_zh_male_cixingnansang_tob", "磁性男嗓", "zh-CN", "icl"),
    ]
}

/// Whether `voice_type` is in the catalog.
pub fn is_known_voice(voice_type: &str) -> bool {
    available_voices().iter().any(|v| v.id == voice_type)
}
