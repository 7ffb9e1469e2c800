//! Environment variable loading and merging with YAML overrides.

use std::env;
use std::str::FromStr;

use super::ServerConfig;
use super::yaml::YamlConfig;
use crate::core::tts::volcengine::{DEFAULT_SESSION_TIMEOUT, DEFAULT_VOICE_TYPE, VOLCENGINE_TTS_URL};

pub(super) const DEFAULT_HOST: &str = "0.0.0.0";
pub(super) const DEFAULT_PORT: u16 = 3000;
pub(super) const DEFAULT_DIALOGUE_VOICE_B: &str = "ICL_zh_male_cixingnansang_tob";
pub(super) const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
pub(super) const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

/// Non-empty, trimmed value of an environment variable.
fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an environment variable, `None` when unset.
fn parse_env<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| format!("Invalid value for {name} ({raw}): {e}"))
        })
        .transpose()
}

/// Build the configuration from defaults, then environment, then `yaml`.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let tts = yaml.tts.unwrap_or_default();
    let dialogue = yaml.dialogue.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let host = server
        .host
        .or_else(|| env_var("HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match server.port {
        Some(port) => port,
        None => parse_env("PORT")?.unwrap_or(DEFAULT_PORT),
    };

    let tts_timeout_seconds = match tts.timeout_seconds {
        Some(secs) => secs,
        None => parse_env("TTS_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_SESSION_TIMEOUT.as_secs()),
    };
    let default_speed_ratio = match tts.speed_ratio {
        Some(ratio) => ratio,
        None => parse_env("DEFAULT_SPEED")?.unwrap_or(1.0),
    };
    let default_volume_ratio = match tts.volume_ratio {
        Some(ratio) => ratio,
        None => parse_env("DEFAULT_VOLUME")?.unwrap_or(1.0),
    };

    let rate_limit_requests_per_second = match security.rate_limit_requests_per_second {
        Some(rps) => rps,
        None => parse_env("RATE_LIMIT_REQUESTS_PER_SECOND")?.unwrap_or(DEFAULT_RATE_LIMIT_RPS),
    };
    let rate_limit_burst_size = match security.rate_limit_burst_size {
        Some(burst) => burst,
        None => parse_env("RATE_LIMIT_BURST_SIZE")?.unwrap_or(DEFAULT_RATE_LIMIT_BURST),
    };

    Ok(ServerConfig {
        host,
        port,
        volcengine_app_id: tts.app_id.or_else(|| env_var("VOLCENGINE_TTS_APP_ID")),
        volcengine_access_token: tts
            .access_token
            .or_else(|| env_var("VOLCENGINE_TTS_ACCESS_TOKEN")),
        volcengine_cluster: tts.cluster.or_else(|| env_var("VOLCENGINE_TTS_CLUSTER")),
        tts_endpoint: tts
            .endpoint
            .or_else(|| env_var("VOLCENGINE_TTS_ENDPOINT"))
            .unwrap_or_else(|| VOLCENGINE_TTS_URL.to_string()),
        default_voice_type: tts
            .voice_type
            .or_else(|| env_var("VOLCENGINE_TTS_VOICE_TYPE"))
            .unwrap_or_else(|| DEFAULT_VOICE_TYPE.to_string()),
        default_speed_ratio,
        default_volume_ratio,
        tts_timeout_seconds,
        dialogue_voice_a: dialogue
            .voice_a
            .or_else(|| env_var("DIALOGUE_VOICE_A"))
            .unwrap_or_else(|| DEFAULT_VOICE_TYPE.to_string()),
        dialogue_voice_b: dialogue
            .voice_b
            .or_else(|| env_var("DIALOGUE_VOICE_B"))
            .unwrap_or_else(|| DEFAULT_DIALOGUE_VOICE_B.to_string()),
        cors_allowed_origins: security
            .cors_allowed_origins
            .or_else(|| env_var("CORS_ALLOWED_ORIGINS")),
        rate_limit_requests_per_second,
        rate_limit_burst_size,
    })
}

