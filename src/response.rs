//! Response construction.
//!
//! Handlers assemble an explicit `ApiReply` value (status, cookies, JSON
//! body); the conversion to an axum response applies it exactly once. The
//! session manager and account service never see a response object.

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};
use serde_json::Value;
use tracing::warn;

/// Cookie name carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Build a Set-Cookie value for a session credential.
///
/// HTTP-only and Secure: not readable by client script, sent only over
/// encrypted transport.
pub fn build_set_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Strict",
        name,
        value,
        max_age_secs.max(0)
    )
}

/// Build a Set-Cookie value that clears a session credential.
pub fn build_clear_cookie(name: &str) -> String {
    format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=Strict",
        name
    )
}

/// Explicit response value: status, cookies to set, JSON body.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: StatusCode,
    pub cookies: Vec<String>,
    pub body: Value,
}

impl ApiReply {
    /// A 200 reply with the given body.
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            cookies: Vec::new(),
            body,
        }
    }

    /// A 201 reply with the given body.
    pub fn created(body: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            cookies: Vec::new(),
            body,
        }
    }

    /// Attach a cookie to set on the response.
    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.cookies.push(cookie);
        self
    }
}

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        for cookie in self.cookies {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(_) => warn!("dropping unencodable Set-Cookie value"),
            }
        }
        response
    }
}
