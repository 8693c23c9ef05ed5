//! Session lifecycle manager.
//!
//! Orchestrates login, logout, refresh-token rotation, and password changes
//! over the credential store and the token codec. The manager is
//! request-scoped and stateless: all durable session state is the single
//! `refresh_token` field on the user record.
//!
//! ## Rotation model
//!
//! Every successful login or refresh mints a fresh access/refresh pair and
//! overwrites the stored refresh token. The overwrite is the only form of
//! invalidation: a presented refresh token that no longer matches the
//! stored string byte-for-byte is rejected, even if its signature and
//! expiry are still valid. Two racing refreshes may both read a matching
//! token and both write; the storage write is last-writer-wins and the
//! loser's pair simply goes stale on its next use.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use tracing::{debug, warn};

use crate::db::{Db, PublicUser, QueryBuilder};
use crate::error::{ApiError, ApiResult};
use crate::password::{self, validate_password};
use crate::token::{TokenCodec, TokenKind, TokenPair};
use crate::types::{AccessToken, RefreshToken};

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    /// The authenticated user, secret fields stripped.
    pub user: PublicUser,
    /// Freshly minted token pair.
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Orchestrates the access/refresh token lifecycle for one store and codec.
#[derive(Clone)]
pub struct SessionManager {
    db: Db,
    codec: Arc<TokenCodec>,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new(db: Db, codec: Arc<TokenCodec>) -> Self {
        Self { db, codec }
    }

    /// Access to the codec, shared with the request identity middleware.
    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Mint a fresh pair and persist the refresh half as the sole valid
    /// refresh token for this user.
    async fn mint_and_store(&self, user_id: &RecordId) -> ApiResult<TokenPair> {
        let access = self.codec.issue(user_id, TokenKind::Access)?;
        let refresh = self.codec.issue(user_id, TokenKind::Refresh)?;

        QueryBuilder::update_refresh_token(&self.db, user_id, Some(refresh.clone())).await?;

        Ok(TokenPair {
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(refresh),
        })
    }

    /// Authenticate by username or email plus password.
    ///
    /// The identifier matches either alternate key; only one needs to hit.
    /// Exactly one persisted write happens on success: the refresh-token
    /// field.
    pub async fn login(&self, identifier: &str, pass: &str) -> ApiResult<SessionStart> {
        let identifier = identifier.trim();
        if identifier.is_empty() || pass.is_empty() {
            return Err(ApiError::Validation(
                "identifier and password are required".to_string(),
            ));
        }

        let user = QueryBuilder::find_user_by_alternate_keys(
            &self.db,
            &identifier.to_lowercase(),
            identifier,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("user does not exist".to_string()))?;

        if !password::verify_password(&user.password_hash, pass) {
            return Err(ApiError::InvalidCredential);
        }

        let tokens = self.mint_and_store(&user.id).await?;
        debug!(user = %user.username, "login succeeded");

        Ok(SessionStart {
            user: user.into(),
            tokens,
        })
    }

    /// Clear the stored refresh token for a user.
    ///
    /// Idempotent, and deliberately infallible: logout is best-effort
    /// cleanup, and the operative action from the caller's perspective is
    /// the cookie clearing at the transport layer. A storage failure here
    /// is logged and swallowed.
    pub async fn logout(&self, user_id: &RecordId) {
        if let Err(e) = QueryBuilder::update_refresh_token(&self.db, user_id, None).await {
            warn!(user_id = %user_id, "logout could not clear refresh token: {}", e);
        }
    }

    /// Exchange a refresh token for a new pair, rotating the stored value.
    ///
    /// Every rejection here is `Unauthorized`; a superseded token is a
    /// normal rejected request, not a server fault.
    pub async fn refresh(&self, presented: Option<&str>) -> ApiResult<TokenPair> {
        let presented = match presented {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ApiError::Unauthorized("refresh token required".to_string())),
        };

        let claims = self.codec.verify(presented, TokenKind::Refresh)?;

        let user = QueryBuilder::find_user_by_id(&self.db, &claims.user_id())
            .await?
            .ok_or_else(|| ApiError::Unauthorized("unknown subject".to_string()))?;

        // Exact string comparison against the stored anchor. A token that
        // is cryptographically valid but textually different has been
        // rotated out and must be rejected.
        if user.refresh_token.as_deref() != Some(presented) {
            debug!(user = %user.username, "stale refresh token presented");
            return Err(ApiError::Unauthorized(
                "refresh token expired or superseded".to_string(),
            ));
        }

        self.mint_and_store(&user.id).await
    }

    /// Replace the user's password after re-verifying the old one.
    ///
    /// The new password must satisfy the same rule as at registration.
    pub async fn change_password(
        &self,
        user_id: &RecordId,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let user = QueryBuilder::find_user_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("user does not exist".to_string()))?;

        if !password::verify_password(&user.password_hash, old_password) {
            return Err(ApiError::InvalidCredential);
        }

        validate_password(new_password)?;
        let hash = password::hash_password(new_password)?;
        QueryBuilder::update_password(&self.db, &user.id, hash).await?;

        Ok(())
    }
}
