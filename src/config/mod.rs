//! Configuration module for the podcast gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading and merging
//!
//! # Example
//! ```rust,no_run
//! use podcast_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

mod env;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::dialogue::{HOST_A, HOST_B};
use crate::core::tts::base::TTSError;
use crate::core::tts::volcengine::{
    DEFAULT_SESSION_TIMEOUT, DEFAULT_VOICE_TYPE, MAX_SESSION_TIMEOUT, VOLCENGINE_TTS_URL, VoiceParams,
    VolcengineTtsConfig,
};
use crate::utils::url_validation::validate_tts_endpoint;

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port)
/// - Volcengine TTS credentials and endpoint
/// - Default voice parameters and dialogue voices
/// - Security settings (CORS, rate limiting)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Volcengine TTS credentials
    pub volcengine_app_id: Option<String>,
    pub volcengine_access_token: Option<String>,
    pub volcengine_cluster: Option<String>,
    pub tts_endpoint: String,

    // Synthesis defaults
    pub default_voice_type: String,
    pub default_speed_ratio: f32,
    pub default_volume_ratio: f32,
    pub tts_timeout_seconds: u64,

    // Dialogue voices for hostA / hostB
    pub dialogue_voice_a: String,
    pub dialogue_voice_b: String,

    // Security configuration
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    pub rate_limit_requests_per_second: u32,
    pub rate_limit_burst_size: u32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("volcengine_app_id", &self.volcengine_app_id)
            .field(
                "volcengine_access_token",
                &self.volcengine_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("volcengine_cluster", &self.volcengine_cluster)
            .field("tts_endpoint", &self.tts_endpoint)
            .field("default_voice_type", &self.default_voice_type)
            .field("default_speed_ratio", &self.default_speed_ratio)
            .field("default_volume_ratio", &self.default_volume_ratio)
            .field("tts_timeout_seconds", &self.tts_timeout_seconds)
            .field("dialogue_voice_a", &self.dialogue_voice_a)
            .field("dialogue_voice_b", &self.dialogue_voice_b)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field(
                "rate_limit_requests_per_second",
                &self.rate_limit_requests_per_second,
            )
            .field("rate_limit_burst_size", &self.rate_limit_burst_size)
            .finish()
    }
}

impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut token) = self.volcengine_access_token {
            token.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::DEFAULT_HOST.to_string(),
            port: env::DEFAULT_PORT,
            volcengine_app_id: None,
            volcengine_access_token: None,
            volcengine_cluster: None,
            tts_endpoint: VOLCENGINE_TTS_URL.to_string(),
            default_voice_type: DEFAULT_VOICE_TYPE.to_string(),
            default_speed_ratio: 1.0,
            default_volume_ratio: 1.0,
            tts_timeout_seconds: DEFAULT_SESSION_TIMEOUT.as_secs(),
            dialogue_voice_a: DEFAULT_VOICE_TYPE.to_string(),
            dialogue_voice_b: env::DEFAULT_DIALOGUE_VOICE_B.to_string(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: env::DEFAULT_RATE_LIMIT_RPS,
            rate_limit_burst_size: env::DEFAULT_RATE_LIMIT_BURST,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and `.env`, loaded by `main`).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file; its values override the environment.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = env::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that do not depend on credentials being present.
    pub fn validate(&self) -> Result<(), TTSError> {
        validate_tts_endpoint(&self.tts_endpoint)
            .map_err(|e| TTSError::InvalidConfiguration(format!("VOLCENGINE_TTS_ENDPOINT: {e}")))?;
        if !(1..=MAX_SESSION_TIMEOUT.as_secs()).contains(&self.tts_timeout_seconds) {
            return Err(TTSError::InvalidConfiguration(format!(
                "TTS_TIMEOUT_SECONDS must be between 1 and {}",
                MAX_SESSION_TIMEOUT.as_secs()
            )));
        }
        if self.rate_limit_requests_per_second == 0 || self.rate_limit_burst_size == 0 {
            return Err(TTSError::InvalidConfiguration(
                "rate limit values must be greater than zero".to_string(),
            ));
        }
        self.default_voice().validate()?;
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tts_timeout(&self) -> Duration {
        Duration::from_secs(self.tts_timeout_seconds)
    }

    /// Whether app id, access token and cluster are all present.
    pub fn has_tts_credentials(&self) -> bool {
        self.volcengine_app_id.is_some()
            && self.volcengine_access_token.is_some()
            && self.volcengine_cluster.is_some()
    }

    /// Build the client configuration consumed by the TTS core.
    pub fn tts_config(&self) -> Result<VolcengineTtsConfig, TTSError> {
        let missing: Vec<&str> = [
            ("VOLCENGINE_TTS_APP_ID", &self.volcengine_app_id),
            ("VOLCENGINE_TTS_ACCESS_TOKEN", &self.volcengine_access_token),
            ("VOLCENGINE_TTS_CLUSTER", &self.volcengine_cluster),
        ]
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();

        match (
            &self.volcengine_app_id,
            &self.volcengine_access_token,
            &self.volcengine_cluster,
        ) {
            (Some(app_id), Some(token), Some(cluster)) => {
                let config = VolcengineTtsConfig::new(app_id, token, cluster)
                    .with_endpoint(&self.tts_endpoint)
                    .with_timeout(self.tts_timeout());
                config.validate()?;
                Ok(config)
            }
            _ => Err(TTSError::MissingCredentials(format!(
                "missing {}",
                missing.join(", ")
            ))),
        }
    }

    /// Voice used for single-speaker synthesis when the request names none.
    pub fn default_voice(&self) -> VoiceParams {
        VoiceParams::new(&self.default_voice_type)
            .with_speed_ratio(self.default_speed_ratio)
            .with_volume_ratio(self.default_volume_ratio)
    }

    /// Voice map for dialogue scripts, keyed by speaker id.
    pub fn dialogue_voices(&self) -> HashMap<String, VoiceParams> {
        let base = self.default_voice();
        HashMap::from([
            (
                HOST_A.to_string(),
                VoiceParams {
                    voice_type: self.dialogue_voice_a.clone(),
                    ..base.clone()
                },
            ),
            (
                HOST_B.to_string(),
                VoiceParams {
                    voice_type: self.dialogue_voice_b.clone(),
                    ..base
                },
            ),
        ])
    }
}
