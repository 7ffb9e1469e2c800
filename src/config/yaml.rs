use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///
/// tts:
///   app_id: "your-app-id"
///   access_token: "your-access-token"
///   cluster: "volcano_tts"
///   endpoint: "wss://openspeech.bytedance.com/api/v1/tts/ws_binary"
///   voice_type: "zh_female_linjia_mars_bigtts"
///   speed_ratio: 1.0
///   volume_ratio: 1.0
///   timeout_seconds: 30
///
/// dialogue:
///   voice_a: "zh_female_linjia_mars_bigtts"
///   voice_b: "ICL_zh_male_cixingnansang_tob"
///
/// security:
///   cors_allowed_origins: "https://podcast.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub tts: Option<TtsYaml>,
    pub dialogue: Option<DialogueYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Volcengine TTS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub app_id: Option<String>,
    pub access_token: Option<String>,
    pub cluster: Option<String>,
    pub endpoint: Option<String>,
    pub voice_type: Option<String>,
    pub speed_ratio: Option<f32>,
    pub volume_ratio: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Dialogue voices from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DialogueYaml {
    pub voice_a: Option<String>,
    pub voice_b: Option<String>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
