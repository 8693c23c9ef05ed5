//! Service configuration.
//!
//! Signing secrets, expiry windows, and the media endpoint are read from the
//! process environment exactly once, here at the boundary. The token codec
//! and media store receive these structs by injection and never touch
//! ambient state themselves.

use serde::{Deserialize, Serialize};
use std::env;

/// Signing and expiry configuration for the token codec.
///
/// Access and refresh tokens use distinct secrets, so a token of one kind
/// can never verify as the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// HS256 secret for access tokens.
    pub access_secret: String,
    /// Access token lifetime in seconds (minutes-scale).
    pub access_ttl_secs: i64,
    /// HS256 secret for refresh tokens.
    pub refresh_secret: String,
    /// Refresh token lifetime in seconds (days-scale).
    pub refresh_ttl_secs: i64,
}

impl TokenConfig {
    /// 15 minutes.
    pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
    /// 10 days.
    pub const DEFAULT_REFRESH_TTL_SECS: i64 = 10 * 24 * 60 * 60;

    /// Load from the environment, with development fallbacks.
    pub fn from_env() -> Self {
        Self {
            access_secret: env::var("ACCESS_TOKEN_SECRET")
                .unwrap_or_else(|_| "dev-access-secret".to_string()),
            access_ttl_secs: env::var("ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_ACCESS_TTL_SECS),
            refresh_secret: env::var("REFRESH_TOKEN_SECRET")
                .unwrap_or_else(|_| "dev-refresh-secret".to_string()),
            refresh_ttl_secs: env::var("REFRESH_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_REFRESH_TTL_SECS),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_secret: "dev-access-secret".to_string(),
            access_ttl_secs: Self::DEFAULT_ACCESS_TTL_SECS,
            refresh_secret: "dev-refresh-secret".to_string(),
            refresh_ttl_secs: Self::DEFAULT_REFRESH_TTL_SECS,
        }
    }
}

/// Configuration for the external object-upload service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Upload endpoint URL.
    pub upload_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_url: env::var("MEDIA_UPLOAD_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:9000/upload".to_string()),
        }
    }
}
