//! Error taxonomy for the identity service.
//!
//! Every failure surfaces to the caller as a single structured JSON error
//! response. No retries happen inside this service; transient storage
//! failures propagate as `Internal` and are the caller's responsibility.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use tracing::error;

/// Errors that can occur while handling an identity request.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Missing or malformed input.
    Validation(String),

    /// Duplicate username or email.
    Conflict(String),

    /// No matching identity.
    NotFound(String),

    /// Password mismatch against the stored derived form.
    InvalidCredential,

    /// Missing, invalid, expired, or superseded token.
    Unauthorized(String),

    /// Storage or codec failure with no recoverable meaning.
    Internal(String),
}

impl ApiError {
    /// HTTP status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation failed: {}", msg),
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::InvalidCredential => write!(f, "Invalid credentials"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<surrealdb::Error> for ApiError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details stay in the log, not the response body
        let message = match &self {
            Self::Internal(msg) => {
                error!("internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "message": message,
        }));

        (self.status(), body).into_response()
    }
}

/// Result type for identity operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_anyhow_conversion_is_internal() {
        let err: ApiError = anyhow::anyhow!("db went away").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ApiError::Unauthorized("no token".into()).to_string(),
            "Unauthorized: no token"
        );
        assert_eq!(ApiError::InvalidCredential.to_string(), "Invalid credentials");
    }
}
