//! TTS endpoint validation.
//!
//! The endpoint must be a WebSocket URL (`ws` or `wss`) with a host. Plain
//! `ws` is accepted for local mock servers; for any other host it is allowed
//! but logged, since the access token travels in the handshake headers.

use std::net::IpAddr;

use thiserror::Error;
use tracing::warn;
use url::{Host, Url};

/// Errors that can occur during URL validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be ws or wss, got: {0}")]
    WebSocketRequired(String),

    #[error("URL must have a host")]
    MissingHost,
}

/// Whether `host` is the local machine.
pub fn is_loopback_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => IpAddr::V4(*ip).is_loopback(),
        Host::Ipv6(ip) => IpAddr::V6(*ip).is_loopback(),
    }
}

/// Validate a TTS WebSocket endpoint and return the parsed URL.
pub fn validate_tts_endpoint(endpoint: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(endpoint)?;

    let scheme = url.scheme();
    if scheme != "ws" && scheme != "wss" {
        return Err(UrlValidationError::WebSocketRequired(scheme.to_string()));
    }

    let host = url.host().ok_or(UrlValidationError::MissingHost)?;
    if matches!(host, Host::Domain(domain) if domain.is_empty()) {
        return Err(UrlValidationError::MissingHost);
    }

    if scheme == "ws" && !is_loopback_host(&host) {
        warn!(
            "TTS endpoint {} uses unencrypted ws://; credentials are sent in clear text",
            host
        );
    }

    Ok(url)
}
