//! Request identity middleware.
//!
//! Resolves the caller's identity from an inbound access token before
//! protected handlers run. The token is taken from the `accessToken` cookie
//! or an `Authorization: Bearer` header, verified by the codec, and the
//! subject's record is loaded so deleted users are rejected even while
//! their access tokens are still unexpired.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use surrealdb::RecordId;

use crate::api::AppState;
use crate::db::{PublicUser, QueryBuilder};
use crate::error::ApiError;
use crate::response::ACCESS_COOKIE;
use crate::token::TokenKind;

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub user: PublicUser,
}

impl RequestIdentity {
    /// Database id of the authenticated user.
    pub fn user_id(&self) -> &RecordId {
        &self.user.id
    }
}

/// Read a named cookie from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Pull the access token from cookie or Authorization header.
fn access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = cookie_value(headers, ACCESS_COOKIE) {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
}

/// Middleware guarding protected routes.
///
/// On success, a [`RequestIdentity`] is available to the handler via
/// request extensions. Any failure is a 401.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = access_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("access token required".to_string()))?;

    let claims = state.sessions.codec().verify(&token, TokenKind::Access)?;

    let user = QueryBuilder::find_user_by_id(&state.db, &claims.user_id())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown subject".to_string()))?;

    request
        .extensions_mut()
        .insert(RequestIdentity { user: user.into() });

    Ok(next.run(request).await)
}
