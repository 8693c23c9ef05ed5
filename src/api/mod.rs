// HTTP endpoints for the identity service.
//
// Handlers translate between the wire (JSON bodies, multipart uploads,
// cookies) and the session/account services. All session cookies are set
// and cleared here, through the explicit ApiReply value; nothing below this
// layer touches a response object.

use axum::extract::multipart::{Field, Multipart};
use axum::extract::{Extension, Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;
use uuid::Uuid;

use crate::account::{AccountService, NewAccount};
use crate::auth::{RequestIdentity, cookie_value, require_identity};
use crate::db::{Db, MediaSlot, ProfileUpdate};
use crate::error::{ApiError, ApiResult};
use crate::media::MediaStore;
use crate::response::{
    ACCESS_COOKIE, ApiReply, REFRESH_COOKIE, build_clear_cookie, build_set_cookie,
};
use crate::session::SessionManager;
use crate::token::TokenPair;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub sessions: SessionManager,
    pub accounts: AccountService,
    pub media: MediaStore,
}

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/me", get(me).patch(update_me))
        .route("/me/avatar", patch(update_avatar))
        .route("/me/cover-image", patch(update_cover_image))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_identity,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Cookies carrying a freshly minted pair, lifetimes matching the TTLs.
fn pair_cookies(state: &AppState, pair: &TokenPair) -> (String, String) {
    let config = state.sessions.codec().config();
    (
        build_set_cookie(ACCESS_COOKIE, pair.access_token.as_str(), config.access_ttl_secs),
        build_set_cookie(
            REFRESH_COOKIE,
            pair.refresh_token.as_str(),
            config.refresh_ttl_secs,
        ),
    )
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<ApiReply> {
    let session = state
        .sessions
        .login(&request.identifier, &request.password)
        .await?;

    let (access, refresh) = pair_cookies(&state, &session.tokens);
    Ok(ApiReply::ok(json!({
        "success": true,
        "message": "logged in",
        "data": session,
    }))
    .with_cookie(access)
    .with_cookie(refresh))
}

async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
) -> ApiReply {
    state.sessions.logout(identity.user_id()).await;

    ApiReply::ok(json!({
        "success": true,
        "message": "logged out",
    }))
    .with_cookie(build_clear_cookie(ACCESS_COOKIE))
    .with_cookie(build_clear_cookie(REFRESH_COOKIE))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> ApiResult<ApiReply> {
    // Cookie first, then body field; the body is optional entirely
    let presented = cookie_value(&headers, REFRESH_COOKIE).or_else(|| {
        serde_json::from_slice::<RefreshRequest>(&body)
            .ok()
            .and_then(|b| b.refresh_token)
    });

    let pair = state.sessions.refresh(presented.as_deref()).await?;

    let (access, refresh) = pair_cookies(&state, &pair);
    Ok(ApiReply::ok(json!({
        "success": true,
        "message": "session refreshed",
        "data": pair,
    }))
    .with_cookie(access)
    .with_cookie(refresh))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<ApiReply> {
    state
        .sessions
        .change_password(identity.user_id(), &request.old_password, &request.new_password)
        .await?;

    Ok(ApiReply::ok(json!({
        "success": true,
        "message": "password changed",
    })))
}

async fn me(Extension(identity): Extension<RequestIdentity>) -> ApiReply {
    ApiReply::ok(json!({
        "success": true,
        "data": identity.user,
    }))
}

async fn update_me(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<ApiReply> {
    let user = state.accounts.update_profile(identity.user_id(), update).await?;

    Ok(ApiReply::ok(json!({
        "success": true,
        "message": "profile updated",
        "data": user,
    })))
}

/// Final path component of a client-supplied file name.
///
/// The name ends up in a local staging path, so anything resembling a
/// directory traversal is cut down to its last component.
fn staged_file_name(raw: Option<&str>) -> String {
    raw.and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string())
}

/// Stage an inbound multipart file field to a local temp path.
async fn stage_upload(field: Field<'_>) -> ApiResult<PathBuf> {
    let file_name = staged_file_name(field.file_name());

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed upload: {}", e)))?;

    let path = std::env::temp_dir().join(format!("identity-gate-{}-{}", Uuid::new_v4(), file_name));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to stage upload: {}", e)))?;

    Ok(path)
}

/// Push a staged file to the media store, then clean up the staging file.
async fn upload_and_discard(media: &MediaStore, path: &Path) -> ApiResult<String> {
    let result = media.upload(path).await;
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("could not remove staged upload {}: {}", path.display(), e);
    }
    let uploaded = result.map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(uploaded.url)
}

async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<ApiReply> {
    let mut username = None;
    let mut email = None;
    let mut full_name = None;
    let mut password = None;
    let mut avatar_path = None;
    let mut cover_path = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("username") => username = Some(read_text_field(field).await?),
            Some("email") => email = Some(read_text_field(field).await?),
            Some("fullName") => full_name = Some(read_text_field(field).await?),
            Some("password") => password = Some(read_text_field(field).await?),
            Some("avatar") => avatar_path = Some(stage_upload(field).await?),
            Some("coverImage") => cover_path = Some(stage_upload(field).await?),
            _ => {}
        }
    }

    let candidate = NewAccount {
        username: username.unwrap_or_default(),
        email: email.unwrap_or_default(),
        full_name: full_name.unwrap_or_default(),
        password: password.unwrap_or_default(),
        avatar_url: None,
        cover_image_url: None,
    };

    // Reject bad input and duplicates before paying for any upload
    state.accounts.ensure_registrable(&candidate).await?;
    let avatar_path =
        avatar_path.ok_or_else(|| ApiError::Validation("avatar is required".to_string()))?;

    let avatar_url = upload_and_discard(&state.media, &avatar_path).await?;
    let cover_image_url = match cover_path {
        Some(path) => Some(upload_and_discard(&state.media, &path).await?),
        None => None,
    };

    let user = state
        .accounts
        .register(NewAccount {
            avatar_url: Some(avatar_url),
            cover_image_url,
            ..candidate
        })
        .await?;
    Ok(ApiReply::created(json!({
        "success": true,
        "message": "user registered",
        "data": user,
    })))
}

async fn read_text_field(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed field: {}", e)))
}

async fn update_media_slot(
    state: &AppState,
    identity: &RequestIdentity,
    mut multipart: Multipart,
    slot: MediaSlot,
) -> ApiResult<ApiReply> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
        .ok_or_else(|| ApiError::Validation("a file field is required".to_string()))?;

    let path = stage_upload(field).await?;
    let url = upload_and_discard(&state.media, &path).await?;

    let user = state
        .accounts
        .set_media_url(identity.user_id(), slot, url)
        .await?;

    Ok(ApiReply::ok(json!({
        "success": true,
        "message": "media updated",
        "data": user,
    })))
}

async fn update_avatar(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    multipart: Multipart,
) -> ApiResult<ApiReply> {
    update_media_slot(&state, &identity, multipart, MediaSlot::Avatar).await
}

async fn update_cover_image(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    multipart: Multipart,
) -> ApiResult<ApiReply> {
    update_media_slot(&state, &identity, multipart, MediaSlot::CoverImage).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MediaConfig, TokenConfig};
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use crate::token::TokenCodec;
    use axum::body::Body;
    use axum::http::{Request, header};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn setup_app() -> (AppState, Router) {
        let db = create_connection(DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        ensure_schema(&db).await.unwrap();

        let codec = Arc::new(TokenCodec::new(TokenConfig::default()));
        let state = AppState {
            db: db.clone(),
            sessions: SessionManager::new(db.clone(), codec),
            accounts: AccountService::new(db.clone()),
            media: MediaStore::new(MediaConfig {
                upload_url: "http://127.0.0.1:9/upload".to_string(),
            })
            .unwrap(),
        };
        let router = create_router(state.clone());
        (state, router)
    }

    async fn seed_ada(state: &AppState) {
        state
            .accounts
            .register(NewAccount {
                username: "ada".to_string(),
                email: "ada@x.io".to_string(),
                full_name: "Ada Lovelace".to_string(),
                password: "s3cret!".to_string(),
                avatar_url: None,
                cover_image_url: None,
            })
            .await
            .unwrap();
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const BOUNDARY: &str = "xyzfieldboundary";

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, filename: &str, contents: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{contents}\r\n"
        )
    }

    fn multipart_post(uri: &str, parts: &[String]) -> Request<Body> {
        let mut body = parts.concat();
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn register_parts(username: &str, password: &str, with_avatar: bool) -> Vec<String> {
        let mut parts = vec![
            text_part("username", username),
            text_part("email", &format!("{}@x.io", username)),
            text_part("fullName", "Some User"),
            text_part("password", password),
        ];
        if with_avatar {
            parts.push(file_part("avatar", "avatar.png", "fake-png-bytes"));
        }
        parts
    }

    #[test]
    fn test_staged_file_name_keeps_final_component() {
        assert_eq!(staged_file_name(Some("avatar.png")), "avatar.png");
        assert_eq!(staged_file_name(Some("a/b/c.png")), "c.png");
        assert_eq!(staged_file_name(Some("../../etc/passwd")), "passwd");
        assert_eq!(staged_file_name(Some("..")), "upload.bin");
        assert_eq!(staged_file_name(None), "upload.bin");
    }

    #[tokio::test]
    async fn test_register_validates_before_upload() {
        // The media endpoint is unreachable, so this only passes if the
        // password rule is checked before any upload is attempted.
        let (_state, router) = setup_app().await;

        let response = router
            .oneshot(multipart_post(
                "/register",
                &register_parts("grace", "tiny", true),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_register_duplicate_rejected_before_upload() {
        let (state, router) = setup_app().await;
        seed_ada(&state).await;

        let response = router
            .oneshot(multipart_post(
                "/register",
                &register_parts("ada", "s3cret!", true),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_missing_avatar_is_validation() {
        let (_state, router) = setup_app().await;

        let response = router
            .oneshot(multipart_post(
                "/register",
                &register_parts("grace", "s3cret!", false),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let (_state, router) = setup_app().await;
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_sets_both_cookies() {
        let (state, router) = setup_app().await;
        seed_ada(&state).await;

        let response = router
            .oneshot(json_post(
                "/login",
                json!({"identifier": "ada", "password": "s3cret!"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
        assert!(cookies.iter().all(|c| c.contains("HttpOnly") && c.contains("Secure")));

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["data"]["accessToken"].is_string());
        assert!(body["data"]["refreshToken"].is_string());
        assert_eq!(body["data"]["user"]["username"], "ada");
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_404() {
        let (_state, router) = setup_app().await;
        let response = router
            .oneshot(json_post(
                "/login",
                json!({"identifier": "ghost", "password": "whatever"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_refresh_via_cookie_and_body() {
        let (state, router) = setup_app().await;
        seed_ada(&state).await;

        let login = router
            .clone()
            .oneshot(json_post(
                "/login",
                json!({"identifier": "ada", "password": "s3cret!"}),
            ))
            .await
            .unwrap();
        let login_body = body_json(login).await;
        let r1 = login_body["data"]["refreshToken"].as_str().unwrap().to_string();

        // Via cookie
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/refresh")
                    .header(header::COOKIE, format!("refreshToken={}", r1))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let r2 = body["data"]["refreshToken"].as_str().unwrap().to_string();
        assert_ne!(r1, r2);

        // Via body, with the now-current token
        let response = router
            .clone()
            .oneshot(json_post("/refresh", json!({"refreshToken": r2})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The superseded token is rejected
        let response = router
            .oneshot(json_post("/refresh", json!({"refreshToken": r1})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_401() {
        let (_state, router) = setup_app().await;
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_requires_identity() {
        let (state, router) = setup_app().await;
        seed_ada(&state).await;

        // No token
        let response = router
            .clone()
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Bearer token from login
        let login = router
            .clone()
            .oneshot(json_post(
                "/login",
                json!({"identifier": "ada", "password": "s3cret!"}),
            ))
            .await
            .unwrap();
        let login_body = body_json(login).await;
        let access = login_body["data"]["accessToken"].as_str().unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", access))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["username"], "ada");
        assert!(body["data"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_cookies() {
        let (state, router) = setup_app().await;
        seed_ada(&state).await;

        let login = router
            .clone()
            .oneshot(json_post(
                "/login",
                json!({"identifier": "ada", "password": "s3cret!"}),
            ))
            .await
            .unwrap();
        let login_body = body_json(login).await;
        let access = login_body["data"]["accessToken"].as_str().unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .header(header::AUTHORIZATION, format!("Bearer {}", access))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_change_password_flow() {
        let (state, router) = setup_app().await;
        seed_ada(&state).await;

        let login = router
            .clone()
            .oneshot(json_post(
                "/login",
                json!({"identifier": "ada", "password": "s3cret!"}),
            ))
            .await
            .unwrap();
        let login_body = body_json(login).await;
        let access = login_body["data"]["accessToken"].as_str().unwrap().to_string();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/change-password")
                    .header(header::AUTHORIZATION, format!("Bearer {}", access))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"oldPassword": "s3cret!", "newPassword": "n3w-secret"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Old password no longer works
        let response = router
            .oneshot(json_post(
                "/login",
                json!({"identifier": "ada", "password": "s3cret!"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
