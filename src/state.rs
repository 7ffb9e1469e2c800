use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::tts::base::TTSError;
use crate::core::tts::volcengine::VolcengineTts;
use crate::errors::AppError;

/// Application state shared by all handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// `None` when the TTS credentials are not configured; synthesis routes then answer 503.
    tts: Option<VolcengineTts>,
}

impl AppState {
    /// Build the state, creating the TTS provider when credentials are present.
    ///
    /// Missing credentials only disable synthesis; an invalid configuration is an error.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, TTSError> {
        let tts = match config.tts_config() {
            Ok(tts_config) => Some(VolcengineTts::new(tts_config)?),
            Err(TTSError::MissingCredentials(msg)) => {
                warn!("Volcengine TTS disabled: {}", msg);
                None
            }
            Err(e) => return Err(e),
        };

        if tts.is_some() {
            info!("Volcengine TTS enabled");
        }

        Ok(Arc::new(Self { config, tts }))
    }

    /// State with an explicit provider.
    pub fn with_tts(config: ServerConfig, tts: VolcengineTts) -> Arc<Self> {
        Arc::new(Self {
            config,
            tts: Some(tts),
        })
    }

    /// The TTS provider, or `NotConfigured` when credentials are missing.
    pub fn tts(&self) -> Result<&VolcengineTts, AppError> {
        self.tts.as_ref().ok_or_else(|| {
            AppError::NotConfigured(
                "set VOLCENGINE_TTS_APP_ID, VOLCENGINE_TTS_ACCESS_TOKEN and VOLCENGINE_TTS_CLUSTER"
                    .to_string(),
            )
        })
    }
}
