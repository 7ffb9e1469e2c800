//! HTTP-facing error type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::dialogue::StitchError;
use crate::core::tts::base::TTSError;
use crate::core::tts::volcengine::SessionError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("TTS service is not configured: {0}")]
    NotConfigured(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[from] SessionError),

    #[error("Dialogue synthesis failed: {0}")]
    Dialogue(#[from] StitchError),
}

impl AppError {
    pub fn client_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotConfigured(_) => "not_configured",
            Self::Synthesis(e) => e.kind(),
            Self::Dialogue(StitchError::UnknownSpeaker { .. }) => "unknown_speaker",
            Self::Dialogue(StitchError::Segment { cause, .. }) => cause.kind(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::Dialogue(StitchError::UnknownSpeaker { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Synthesis(SessionError::Timeout(_))
            | Self::Dialogue(StitchError::Segment {
                cause: SessionError::Timeout(_),
                ..
            }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Synthesis(_) | Self::Dialogue(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<TTSError> for AppError {
    fn from(err: TTSError) -> Self {
        match err {
            TTSError::MissingCredentials(msg) => Self::NotConfigured(msg),
            TTSError::InvalidConfiguration(msg) => Self::InvalidInput(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
            "code": self.client_code(),
        });
        if let Self::Dialogue(e) = &self {
            body["segment_index"] = json!(e.index());
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(TTSError::MissingCredentials("x".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(SessionError::Timeout(Duration::from_secs(30))).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::from(SessionError::Server {
                code: 3001,
                message: "bad".into()
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(StitchError::Segment {
                index: 2,
                cause: SessionError::Timeout(Duration::from_secs(1))
            })
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::from(StitchError::UnknownSpeaker {
                index: 0,
                speaker: "narrator".into()
            })
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = AppError::from(StitchError::Segment {
            index: 1,
            cause: SessionError::Cancelled,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "cancelled");
        assert_eq!(json["segment_index"], 1);
    }
}
