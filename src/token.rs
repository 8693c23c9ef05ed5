//! Token codec: creation and verification of signed, expiring tokens.
//!
//! Two token kinds exist, each with its own signing secret and expiry
//! policy. Access tokens are minutes-scale and carry no server-side state;
//! refresh tokens are days-scale and anchored to the single stored value on
//! the user record. The codec itself knows nothing about storage — it only
//! signs and verifies.

use crate::config::TokenConfig;
use crate::error::{ApiError, ApiResult};
use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use uuid::Uuid;

/// Which token of the pair is being issued or verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both token kinds.
///
/// `jti` makes every mint textually unique, even for the same subject
/// within the same second. Rotation detection compares token strings
/// byte-for-byte, so this matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user record key.
    pub sub: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

impl Claims {
    /// Rebuild the subject's database identifier.
    pub fn user_id(&self) -> RecordId {
        RecordId::from_table_key("user", self.sub.as_str())
    }
}

/// A freshly minted access/refresh pair.
///
/// Not persisted as an entity; the refresh half becomes durable only as the
/// single `refresh_token` value on the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: crate::types::AccessToken,
    pub refresh_token: crate::types::RefreshToken,
}

/// Signs and verifies tokens with per-kind secrets and TTLs.
pub struct TokenCodec {
    config: TokenConfig,
}

impl TokenCodec {
    /// Create a codec from an explicitly injected configuration.
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// The injected configuration (the transport layer reads TTLs from
    /// here when setting cookie lifetimes).
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.config.access_secret.as_bytes(),
            TokenKind::Refresh => self.config.refresh_secret.as_bytes(),
        }
    }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.config.access_ttl_secs,
            TokenKind::Refresh => self.config.refresh_ttl_secs,
        }
    }

    /// Issue a signed token of the given kind for a user.
    pub fn issue(&self, user_id: &RecordId, kind: TokenKind) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.key().to_string(),
            iat: now,
            exp: now + self.ttl_secs(kind),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )?;

        Ok(token)
    }

    /// Verify a token of the given kind.
    ///
    /// Bad signature, malformed structure, and past-expiry all come back as
    /// `Unauthorized`. An expired token is a normal, expected verification
    /// failure, not a system fault.
    pub fn verify(&self, token: &str, kind: TokenKind) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &validation,
        )
        .map_err(|e| ApiError::Unauthorized(format!("invalid token: {}", e)))?;

        Ok(data.claims)
    }
}
