//! Volcengine TTS client configuration.

use std::fmt;
use std::time::Duration;

use super::{
    DEFAULT_CLUSTER, DEFAULT_OPERATION, DEFAULT_SESSION_TIMEOUT, DEFAULT_UID, MAX_SESSION_TIMEOUT,
    VOLCENGINE_TTS_URL,
};
use crate::core::tts::base::TTSError;
use crate::utils::url_validation::validate_tts_endpoint;

/// Connection and account settings shared by every session of a client.
///
/// The access token is zeroized when the config is dropped and redacted from
/// `Debug` output.
#[derive(Clone)]
pub struct VolcengineTtsConfig {
    /// Application id issued by the console.
    pub app_id: String,
    /// Access token, sent as `Authorization: Bearer; <token>`.
    pub access_token: String,
    /// Service cluster, e.g. `volcano_tts`.
    pub cluster: String,
    /// WebSocket endpoint. Overridable for testing and private deployments.
    pub endpoint: String,
    /// User id carried in the envelope.
    pub uid: String,
    /// Request operation.
    pub operation: String,
    /// Deadline of a single session, measured from its start.
    pub timeout: Duration,
}

impl VolcengineTtsConfig {
    pub fn new(
        app_id: impl Into<String>,
        access_token: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            access_token: access_token.into(),
            cluster: cluster.into(),
            endpoint: VOLCENGINE_TTS_URL.to_string(),
            uid: DEFAULT_UID.to_string(),
            operation: DEFAULT_OPERATION.to_string(),
            timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// Value of the `Authorization` header in the exact form the service expects.
    pub fn authorization_header(&self) -> String {
        format!("Bearer; {}", self.access_token)
    }

    /// Validate credentials, endpoint and timeout.
    pub fn validate(&self) -> Result<(), TTSError> {
        if self.app_id.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "app_id is required for Volcengine TTS".to_string(),
            ));
        }
        if self.access_token.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "access_token is required for Volcengine TTS".to_string(),
            ));
        }
        if self.cluster.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "cluster is required for Volcengine TTS".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(TTSError::InvalidConfiguration(
                "session timeout must be greater than zero".to_string(),
            ));
        }
        if self.timeout > MAX_SESSION_TIMEOUT {
            return Err(TTSError::InvalidConfiguration(format!(
                "session timeout must be at most {}s",
                MAX_SESSION_TIMEOUT.as_secs()
            )));
        }
        validate_tts_endpoint(&self.endpoint)
            .map_err(|e| TTSError::InvalidConfiguration(e.to_string()))?;
        Ok(())
    }
}

impl Default for VolcengineTtsConfig {
    fn default() -> Self {
        Self::new("", "", DEFAULT_CLUSTER)
    }
}

impl fmt::Debug for VolcengineTtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolcengineTtsConfig")
            .field("app_id", &self.app_id)
            .field("access_token", &"<redacted>")
            .field("cluster", &self.cluster)
            .field("endpoint", &self.endpoint)
            .field("uid", &self.uid)
            .field("operation", &self.operation)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Drop for VolcengineTtsConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.access_token.zeroize();
    }
}
